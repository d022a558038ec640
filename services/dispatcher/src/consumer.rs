use resonance_bus::BusSubscription;

use crate::fanout;
use crate::state::AppState;

const MAX_IN_FLIGHT: usize = 64;

/// Consumes the push-event subject with bounded in-flight concurrency
///, handing each event to `fanout::handle_event`.
pub async fn run(subscription: BusSubscription, state: AppState) {
    resonance_bus::run_consumer(subscription, MAX_IN_FLIGHT, move |event| {
        let state = state.clone();
        async move { fanout::handle_event(&state, event).await }
    })
    .await;
}
