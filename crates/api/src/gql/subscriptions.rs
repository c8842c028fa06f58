use async_graphql::Subscription;
use futures_util::Stream;
use once_cell::sync::Lazy;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::types::{RegistrationEvent, RegistrationEventType};

static REGISTRATION_BROADCASTER: Lazy<broadcast::Sender<RegistrationEvent>> = Lazy::new(|| {
    let (tx, _) = broadcast::channel(256);
    tx
});

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Registrations being submitted, approved or rejected.
    async fn registration_events(
        &self,
        event_type: Option<RegistrationEventType>,
    ) -> impl Stream<Item = RegistrationEvent> {
        let receiver = REGISTRATION_BROADCASTER.subscribe();
        // Lagging receivers skip the events they missed.
        BroadcastStream::new(receiver).filter_map(move |event| {
            event
                .ok()
                .filter(|event| event_type.map_or(true, |kind| kind == event.event_type))
        })
    }
}

pub fn publish_registration_event(event: RegistrationEvent) {
    // No subscriber is not an error.
    let _ = REGISTRATION_BROADCASTER.send(event);
}
