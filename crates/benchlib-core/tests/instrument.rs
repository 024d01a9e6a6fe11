//! Command dispatch: operation wait, retry, reconnect and channel checks.

mod common;

use std::time::Duration;

use benchlib_core::*;
use benchlib_test_harness::{backends_with, Failure, MockBackend, MockTransport};

#[tokio::test]
async fn sync_runs_once_before_the_command() {
    let mock = MockTransport::new();
    mock.expect_query("*OPC?", "1");
    mock.expect_write("VOLT1,5");
    let handle = mock.handle();
    let mut io = common::instrument_on(&mock, common::PSU).await;
    io.set_operation_wait(OperationWait::Query("*OPC?"));

    io.send("VOLT1,5", ReadWrite::Auto, false).await.unwrap();

    assert_eq!(handle.sent(), vec!["*OPC?", "VOLT1,5"]);
}

#[tokio::test]
async fn skip_sync_sends_only_the_command() {
    let mock = MockTransport::new();
    mock.expect_write("VOLT1,5");
    let handle = mock.handle();
    let mut io = common::instrument_on(&mock, common::PSU).await;
    io.set_operation_wait(OperationWait::Query("*OPC?"));

    io.send("VOLT1,5", ReadWrite::Auto, true).await.unwrap();

    assert_eq!(handle.count("*OPC?"), 0);
    assert_eq!(handle.sent(), vec!["VOLT1,5"]);
}

#[tokio::test(start_paused = true)]
async fn delay_sync_sleeps() {
    let mock = MockTransport::new();
    mock.expect_write("END ALWAYS");
    let mut io = common::instrument_on(&mock, common::METER).await;
    io.set_operation_wait(OperationWait::Delay(Duration::from_millis(100)));

    let started = tokio::time::Instant::now();
    io.write("END ALWAYS").await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let mock = MockTransport::new();
    mock.expect_failure("MEAS1:VOLT?", Failure::Timeout);
    mock.expect_failure("MEAS1:VOLT?", Failure::Transport);
    mock.expect_query("MEAS1:VOLT?", "+1.23E-04");
    let handle = mock.handle();
    let mut io = common::instrument_on(&mock, common::PSU).await;

    let value = io.query_number("MEAS1:VOLT?").await.unwrap();

    assert_eq!(value, 1.23e-4);
    assert_eq!(handle.count("MEAS1:VOLT?"), 3);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_five_attempts_without_reconnect() {
    let mock = MockTransport::permissive();
    mock.fail_next(10, Failure::Timeout);
    let handle = mock.handle();
    let backend = MockBackend::with_transport("mock", mock);
    let connection = Connection::open(
        EndpointSpec::new("TCPIP::bench::INSTR", TransportKind::Raw),
        backends_with(&backend),
        RetryPolicy::default(),
    )
    .await
    .unwrap();
    let mut io = Instrument::new(connection, "acme_ps2", common::PSU);

    let started = tokio::time::Instant::now();
    let err = io.query("MEAS1:VOLT?").await.unwrap_err();

    assert!(matches!(err, Error::Timeout));
    assert_eq!(handle.count("MEAS1:VOLT?"), 5);
    // Four backoffs between five attempts.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    // A timeout is not a lost connection: no reopen.
    assert_eq!(backend.open_count(), 1);
    assert_eq!(io.connection().reconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_triggers_reconnect() {
    let first = MockTransport::permissive();
    first.fail_next(1, Failure::ConnectionLost);
    let first_handle = first.handle();
    let second = MockTransport::new();
    second.expect_query("MEAS1:CURR?", "0.500");
    let backend = MockBackend::with_transport("mock", first);
    backend.push_transport(second);
    let connection = Connection::open(
        EndpointSpec::new("TCPIP::bench::INSTR", TransportKind::Raw),
        backends_with(&backend),
        RetryPolicy::default(),
    )
    .await
    .unwrap();
    let mut io = Instrument::new(connection, "acme_ps2", common::PSU);

    assert_eq!(io.query_number("MEAS1:CURR?").await.unwrap(), 0.5);
    assert_eq!(first_handle.close_count(), 1);
    assert_eq!(backend.open_count(), 2);
    assert_eq!(io.connection().reconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_reconnect_is_not_fatal() {
    let mock = MockTransport::permissive();
    mock.fail_next(1, Failure::ConnectionLost);
    mock.respond("MEAS1:CURR?", "0.25");
    let backend = MockBackend::with_transport("mock", mock.clone());
    let connection = Connection::open(
        EndpointSpec::new("TCPIP::bench::INSTR", TransportKind::Raw),
        backends_with(&backend),
        RetryPolicy {
            reconnect_attempts: 1,
            ..RetryPolicy::default()
        },
    )
    .await
    .unwrap();
    let mut io = Instrument::new(connection, "acme_ps2", common::PSU);

    // The reconnect finds nothing to open; the retry then fails on the
    // closed transport until the attempts run out.
    let err = io.query("MEAS1:CURR?").await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    assert_eq!(io.connection().reconnect_count(), 0);
}

#[tokio::test]
async fn protocol_errors_are_not_retried() {
    let mock = MockTransport::new();
    mock.expect_failure("FUNC1?", Failure::Protocol);
    let handle = mock.handle();
    let mut io = common::instrument_on(&mock, common::LOAD).await;

    let err = io.query("FUNC1?").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(handle.count("FUNC1?"), 1);
}

#[tokio::test]
async fn channel_check_happens_before_io() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let io = common::instrument_on(&mock, common::PSU).await;

    let err = io.check_channel(ChannelId::CH3).unwrap_err();
    assert!(matches!(
        err,
        Error::Channel {
            channel: ChannelId::CH3,
            ..
        }
    ));
    assert!(io.check_channels(&[ChannelId::CH1, ChannelId::CH2]).is_ok());
    assert!(io.check_channels(&[ChannelId::CH1, ChannelId::CH4]).is_err());
    assert!(handle.sent().is_empty());
}

#[tokio::test]
async fn numeric_queries_tolerate_junk() {
    let mock = MockTransport::new();
    mock.expect_query("CONF?", "VOLT,DC,AUTO");
    mock.expect_query("MEAS1:VOLT?", "5");
    mock.expect_query("C1:PAVA? PKPK", "C1:PAVA PKPK,2.50E+00V");
    let mut io = common::instrument_on(&mock, common::SCOPE).await;

    assert_eq!(io.query_numbers("CONF?").await.unwrap(), vec![0.0]);
    assert_eq!(io.query_numbers("MEAS1:VOLT?").await.unwrap(), vec![5.0]);
    assert_eq!(io.query_number("C1:PAVA? PKPK").await.unwrap(), 2.5);
}

#[tokio::test]
async fn get_id_uses_descriptor_command() {
    let mock = MockTransport::new();
    mock.expect_query("ID?", "ACME DM1");
    let mut io = common::instrument_on(&mock, common::METER).await;
    assert_eq!(io.get_id().await.unwrap(), "ACME DM1");
}

#[tokio::test]
async fn close_is_idempotent() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let mut io = common::instrument_on(&mock, common::PSU).await;

    io.close().await.unwrap();
    io.close().await.unwrap();

    assert!(io.is_closed());
    assert_eq!(handle.close_count(), 1);
}

#[tokio::test]
async fn closed_instrument_is_not_reopened() {
    let mock = MockTransport::permissive();
    let handle = mock.handle();
    let backend = MockBackend::with_transport("mock", mock);
    let connection = Connection::open(
        EndpointSpec::new("TCPIP::bench::INSTR", TransportKind::Raw),
        backends_with(&backend),
        RetryPolicy::default(),
    )
    .await
    .unwrap();
    let mut io = Instrument::new(connection, "acme_ps2", common::PSU);
    io.close().await.unwrap();

    let err = io.send("*RST", ReadWrite::Write, false).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected), "{err:?}");
    assert!(matches!(io.query("*IDN?").await, Err(Error::NotConnected)));
    assert_eq!(backend.open_count(), 1);
    assert!(handle.sent().is_empty());
}
