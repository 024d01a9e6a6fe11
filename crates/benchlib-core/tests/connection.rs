//! Connection opening, identification and reconnect against mock backends.

mod common;

use std::sync::Arc;
use std::time::Duration;

use benchlib_core::*;
use benchlib_test_harness::{backends_with, Failure, MockBackend, MockTransport};

fn raw(locator: &str) -> EndpointSpec {
    EndpointSpec::new(locator, TransportKind::Raw)
}

fn scope(model: &'static str) -> InstrumentDescriptor {
    InstrumentDescriptor {
        model,
        manufacturer: "Siglent",
        ..common::SCOPE
    }
}

fn scope_registry() -> Registry {
    let mut reg = Registry::new();
    reg.register("siglent_sds1104x", scope("SDS1104X"), DriverFactory::Scope(common::acme_scope))
        .unwrap();
    reg.register("siglent_sds1104xe", scope("SDS1104XE"), DriverFactory::Scope(common::acme_scope))
        .unwrap();
    reg
}

async fn open_on(mock: &MockTransport) -> Connection {
    let backend = MockBackend::with_transport("mock", mock.clone());
    Connection::open(raw("TCPIP::bench::INSTR"), backends_with(&backend), RetryPolicy::default())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn open_falls_back_and_retries() {
    let primary = MockBackend::refusing("primary");
    let fallback = MockBackend::with_transport("fallback", MockTransport::new());
    fallback.fail_next(2);
    let backends = BackendSet::new(primary.clone(), fallback.clone(), primary.clone());

    let conn = Connection::open(raw("TCPIP::10.0.0.7::INSTR"), backends, RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(primary.open_count(), 3);
    assert_eq!(fallback.open_count(), 3);
    assert_eq!(conn.locator(), "TCPIP::10.0.0.7::INSTR");
}

#[tokio::test(start_paused = true)]
async fn open_gives_up_after_three_attempts() {
    let primary = MockBackend::refusing("primary");
    let fallback = MockBackend::refusing("fallback");
    let backends = BackendSet::new(primary.clone(), fallback.clone(), primary.clone());

    let err = Connection::open(raw("TCPIP::10.0.0.7::INSTR"), backends, RetryPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(primary.open_count(), 3);
    assert_eq!(fallback.open_count(), 3);
}

#[tokio::test]
async fn ethernet_locator_is_wrapped() {
    let backend = MockBackend::with_transport("mock", MockTransport::new());
    let spec = EndpointSpec::new("10.0.0.7", TransportKind::Ethernet);
    Connection::open(spec, backends_with(&backend), RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(backend.opened_locators(), vec!["TCPIP::10.0.0.7::INSTR"]);
}

#[tokio::test]
async fn simulated_without_forced_driver_fails_before_io() {
    let mock = MockTransport::new();
    mock.set_simulated(true);
    let handle = mock.handle();
    let backend = MockBackend::with_transport("sim", mock);
    let spec = raw("TCPIP::sim::INSTR").simulated(true);
    let mut conn = Connection::open(spec, backends_with(&backend), RetryPolicy::default())
        .await
        .unwrap();

    let err = conn.identify(&common::registry(), None).await.unwrap_err();

    assert!(matches!(err, Error::Initialization(_)));
    assert!(err.to_string().contains("which device should be simulated?"));
    assert!(handle.sent().is_empty());
}

#[tokio::test]
async fn simulated_with_forced_driver_skips_io() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let backend = MockBackend::with_transport("sim", mock);
    let spec = raw("TCPIP::sim::INSTR").simulated(true).forced_driver("ACME_PS2");
    let mut conn = Connection::open(spec, backends_with(&backend), RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(conn.identify(&common::registry(), None).await.unwrap(), "acme_ps2");
    assert!(handle.sent().is_empty());
    assert!(conn.is_simulated());
}

#[tokio::test]
async fn auto_detect_prefers_longest_model() {
    let mock = MockTransport::new();
    mock.expect_query("*IDN?", "Siglent Technologies,SDS1104X-E,SDSMMEBQ3R1234,8.2.6.1.37R9");
    let mut conn = open_on(&mock).await;

    let name = conn.identify(&scope_registry(), None).await.unwrap();
    assert_eq!(name, "siglent_sds1104xe");
}

#[tokio::test]
async fn auto_detect_tries_most_common_command_first() {
    // Three drivers answer *IDN?, one answers ID?.
    let mock = MockTransport::new();
    mock.expect_failure("*IDN?", Failure::Timeout);
    mock.expect_query("ID?", "ACME DM1 multimeter");
    let handle = mock.handle();
    let mut conn = open_on(&mock).await;

    let name = conn.identify(&common::registry(), None).await.unwrap();

    assert_eq!(name, "acme_dm1");
    assert_eq!(handle.sent(), vec!["*IDN?", "ID?"]);
}

#[tokio::test]
async fn short_identity_is_queried_twice() {
    let mock = MockTransport::new();
    mock.expect_query("*IDN?", "");
    mock.expect_query("*IDN?", "Acme Instruments,EL2,0001,1.0");
    let handle = mock.handle();
    let mut conn = open_on(&mock).await;

    assert_eq!(conn.identify(&common::registry(), None).await.unwrap(), "acme_el2");
    assert_eq!(handle.count("*IDN?"), 2);
}

#[tokio::test]
async fn identify_timeout_is_restored() {
    let mock = MockTransport::new();
    mock.expect_failure("*IDN?", Failure::Timeout);
    mock.expect_failure("ID?", Failure::Timeout);
    let handle = mock.handle();
    let mut conn = open_on(&mock).await;
    let original = conn.timeout();

    let err = conn.identify(&common::registry(), None).await.unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    assert_eq!(conn.timeout(), original);
    let history = handle.timeout_history();
    assert!(history.contains(&Duration::from_millis(1500)));
    assert_eq!(history.last(), Some(&original));
}

#[tokio::test]
async fn identify_propagates_non_timeout_errors() {
    let mock = MockTransport::new();
    mock.expect_failure("*IDN?", Failure::ConnectionLost);
    let mut conn = open_on(&mock).await;
    let original = conn.timeout();

    let err = conn.identify(&common::registry(), None).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionLost));
    assert_eq!(conn.timeout(), original);
}

#[tokio::test]
async fn forced_driver_matching_device() {
    let mock = MockTransport::new();
    mock.expect_query("*IDN?", "ACME,PS2,0001,2.3");
    let mut conn = Connection::open(
        raw("TCPIP::bench::INSTR").forced_driver("acme_ps2"),
        backends_with(&MockBackend::with_transport("mock", mock)),
        RetryPolicy::default(),
    )
    .await
    .unwrap();

    assert_eq!(conn.identify(&common::registry(), None).await.unwrap(), "acme_ps2");
}

#[tokio::test]
async fn forced_driver_mismatch_is_initialization_error() {
    let mock = MockTransport::new();
    mock.expect_query("*IDN?", "ACME,EL2,0001,2.3");
    let mut conn = Connection::open(
        raw("TCPIP::bench::INSTR").forced_driver("acme_ps2"),
        backends_with(&MockBackend::with_transport("mock", mock)),
        RetryPolicy::default(),
    )
    .await
    .unwrap();

    let err = conn.identify(&common::registry(), None).await.unwrap_err();
    assert!(matches!(err, Error::Initialization(_)));
    assert!(err.to_string().contains("acme_el2"));
}

#[tokio::test]
async fn forced_driver_unknown_identity_asks_caller() {
    let declined = {
        let mock = MockTransport::new();
        mock.expect_query("*IDN?", "Mystery Corp,X1,0,0");
        let mut conn = Connection::open(
            raw("TCPIP::bench::INSTR").forced_driver("acme_ps2"),
            backends_with(&MockBackend::with_transport("mock", mock)),
            RetryPolicy::default(),
        )
        .await
        .unwrap();
        let no: Box<ConfirmOverride> = Box::new(|_: &str, _: &str| false);
        conn.identify(&common::registry(), Some(no.as_ref())).await
    };
    assert!(matches!(declined, Err(Error::Connection(_))));

    let mock = MockTransport::new();
    mock.expect_query("*IDN?", "Mystery Corp,X1,0,0");
    let mut conn = Connection::open(
        raw("TCPIP::bench::INSTR").forced_driver("acme_ps2"),
        backends_with(&MockBackend::with_transport("mock", mock)),
        RetryPolicy::default(),
    )
    .await
    .unwrap();
    let asked = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = Arc::clone(&asked);
    let yes: Box<ConfirmOverride> = Box::new(move |name: &str, response: &str| {
        seen.lock().unwrap().push((name.to_string(), response.to_string()));
        true
    });

    let name = conn.identify(&common::registry(), Some(yes.as_ref())).await.unwrap();
    assert_eq!(name, "acme_ps2");
    assert_eq!(
        asked.lock().unwrap().as_slice(),
        &[("acme_ps2".to_string(), "Mystery Corp,X1,0,0".to_string())]
    );
}

#[tokio::test]
async fn forced_driver_must_be_registered() {
    let mock = MockTransport::new();
    let mut conn = Connection::open(
        raw("TCPIP::bench::INSTR").forced_driver("rigol_dp832"),
        backends_with(&MockBackend::with_transport("mock", mock)),
        RetryPolicy::default(),
    )
    .await
    .unwrap();
    let err = conn.identify(&common::registry(), None).await.unwrap_err();
    assert!(matches!(err, Error::Initialization(_)));
}

#[tokio::test]
async fn no_match_is_connection_error() {
    let mock = MockTransport::new();
    mock.expect_query("*IDN?", "Mystery Corp,X1,0,0");
    mock.expect_query("ID?", "Mystery Corp,X1,0,0");
    let mut conn = open_on(&mock).await;
    let err = conn.identify(&common::registry(), None).await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

#[tokio::test]
async fn exchange_trims_terminators_and_classifies() {
    let mock = MockTransport::new();
    mock.expect_query("MEAS:VOLT?", "12.000\r\n");
    mock.expect_write("OUTP ON");
    let mut conn = open_on(&mock).await;

    assert_eq!(conn.exchange("MEAS:VOLT?", ReadWrite::Auto).await.unwrap(), "12.000");
    assert_eq!(conn.exchange("OUTP ON", ReadWrite::Auto).await.unwrap(), "");
}

#[tokio::test(start_paused = true)]
async fn reconnect_reopens_and_keeps_timeout() {
    let first = MockTransport::new();
    let second = MockTransport::new();
    let first_handle = first.handle();
    let backend = MockBackend::with_transport("mock", first);
    let mut conn = Connection::open(raw("TCPIP::bench::INSTR"), backends_with(&backend), RetryPolicy::default())
        .await
        .unwrap();
    conn.set_timeout(Duration::from_secs(7));

    backend.push_transport(second.clone());
    backend.fail_next(1);
    conn.reconnect().await.unwrap();

    assert_eq!(first_handle.close_count(), 1);
    assert_eq!(conn.reconnect_count(), 1);
    assert_eq!(second.handle().timeout(), Duration::from_secs(7));
    assert_eq!(backend.open_count(), 3);
}

#[tokio::test]
async fn reconnect_is_noop_when_simulated() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let backend = MockBackend::with_transport("sim", mock);
    let mut conn = Connection::open(
        raw("TCPIP::sim::INSTR").simulated(true),
        backends_with(&backend),
        RetryPolicy::default(),
    )
    .await
    .unwrap();

    conn.reconnect().await.unwrap();
    assert_eq!(handle.close_count(), 0);
    assert_eq!(conn.reconnect_count(), 0);
    assert_eq!(backend.open_count(), 1);
}

#[tokio::test]
async fn list_resources_merges_backends() {
    let primary = MockBackend::new("primary");
    let fallback = MockBackend::new("fallback");
    primary.set_resources(&["TCPIP::10.0.0.7::INSTR", "ASRL1::INSTR"]);
    fallback.set_resources(&["ASRL1::INSTR", "ASRL2::INSTR"]);
    let backends = BackendSet::new(primary.clone(), fallback, primary);

    assert_eq!(
        list_resources(&backends).await.unwrap(),
        vec!["ASRL1::INSTR", "ASRL2::INSTR", "TCPIP::10.0.0.7::INSTR"]
    );
}
