//! Domain event fan-out. Events are always logged; they are also published
//! to NATS as JSON when a connection is configured.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, %url, "NATS unavailable, events will only be logged");
                Self::default()
            }
        }
    }

    /// Delivery failures are logged and swallowed.
    pub async fn publish(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            tracing::info!(subject = event.subject(), event = ?event, "domain event");
            let Some(nats) = &self.nats else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, "could not serialise domain event");
                    continue;
                }
            };
            if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
                tracing::warn!(error = %e, subject = event.subject(), "failed to publish domain event");
            }
        }
    }
}
