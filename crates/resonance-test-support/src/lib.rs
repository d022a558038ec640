// resonance-test-support: shared test doubles for the integration suites.
//
// `MockWsClient` drives an edge's client-facing WebSocket endpoint using the
// real bincode `Envelope` framing. `MockPushServer` stands in for an edge's
// internal push endpoint so dispatcher tests don't need a live edge process.
// The in-memory bus/presence doubles live alongside their traits in
// `resonance-bus::test_support` and `resonance-presence::test_support`.

pub mod mock_push_server;
pub mod mock_ws_client;

pub use mock_push_server::MockPushServer;
pub use mock_ws_client::MockWsClient;
