//! Shared helpers for driver unit tests.

use benchlib_core::{
    Connection, EndpointSpec, Instrument, InstrumentDescriptor, RetryPolicy, TransportKind,
};
use benchlib_test_harness::{backends_with, MockBackend, MockTransport};

/// An [`Instrument`] on `mock` with no operation-complete wait, so the
/// mock sees exactly the commands a driver primitive sends.
pub(crate) async fn instrument_on(
    mock: &MockTransport,
    descriptor: InstrumentDescriptor,
) -> Instrument {
    let backend = MockBackend::with_transport("mock", mock.clone());
    let connection = Connection::open(
        EndpointSpec::new("TCPIP::bench::INSTR", TransportKind::Raw),
        backends_with(&backend),
        RetryPolicy::default(),
    )
    .await
    .expect("mock connection opens");
    Instrument::new(connection, descriptor.name(), descriptor)
}
