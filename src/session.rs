//! Binding between the player and at most one remote session.
//!
//! Binding and unbinding are the only places where status/progress
//! subscriptions are registered or removed on a client.

use std::time::Duration;

use log::{debug, info};

use crate::remote::{MediaStatus, RemoteClient, RemoteEventSender};

pub struct RemoteSessionBinding {
    client: Option<Box<dyn RemoteClient>>,
    events: RemoteEventSender,
    progress_period: Duration,
}

impl RemoteSessionBinding {
    pub fn new(events: RemoteEventSender, progress_period: Duration) -> Self {
        Self {
            client: None,
            events,
            progress_period,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.client.is_some()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.client.as_deref().map(|client| client.session_id())
    }

    pub fn client_mut(&mut self) -> Option<&mut (dyn RemoteClient + 'static)> {
        self.client.as_deref_mut()
    }

    pub fn media_status(&self) -> Option<MediaStatus> {
        self.client.as_deref().and_then(|client| client.media_status())
    }

    /// Binds `client`, replacing any previous binding.
    ///
    /// Returns `false` without touching anything when the same session is
    /// already bound.
    pub fn bind(&mut self, mut client: Box<dyn RemoteClient>) -> bool {
        if self.session_id() == Some(client.session_id()) {
            debug!(
                "RemoteSessionBinding: session {} already bound",
                client.session_id()
            );
            return false;
        }
        if let Some(mut previous) = self.client.take() {
            previous.unsubscribe();
            info!(
                "RemoteSessionBinding: released session {}",
                previous.session_id()
            );
        }
        client.subscribe(self.events.clone(), self.progress_period);
        info!("RemoteSessionBinding: bound session {}", client.session_id());
        self.client = Some(client);
        true
    }

    /// Drops the current binding. Returns the released client, if any.
    pub fn unbind(&mut self) -> Option<Box<dyn RemoteClient>> {
        let mut client = self.client.take()?;
        client.unsubscribe();
        info!(
            "RemoteSessionBinding: unbound session {}",
            client.session_id()
        );
        Some(client)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::RemoteSessionBinding;
    use crate::loopback::LoopbackClient;

    #[test]
    fn test_bind_subscribes_with_progress_period() {
        let (events, _receiver) = mpsc::unbounded_channel();
        let mut binding = RemoteSessionBinding::new(events, Duration::from_millis(1000));
        let (client, handle) = LoopbackClient::new("session-a");

        assert!(binding.bind(Box::new(client)));
        assert!(binding.is_bound());
        assert_eq!(handle.progress_period(), Some(Duration::from_millis(1000)));
        assert_eq!(handle.subscription_count(), 1);
    }

    #[test]
    fn test_rebinding_same_session_is_a_no_op() {
        let (events, _receiver) = mpsc::unbounded_channel();
        let mut binding = RemoteSessionBinding::new(events, Duration::from_millis(1000));
        let (client, handle) = LoopbackClient::new("session-a");
        let duplicate = client.duplicate();

        assert!(binding.bind(Box::new(client)));
        assert!(!binding.bind(Box::new(duplicate)));
        assert_eq!(handle.subscription_count(), 1);
    }

    #[test]
    fn test_switching_sessions_unsubscribes_previous_client() {
        let (events, _receiver) = mpsc::unbounded_channel();
        let mut binding = RemoteSessionBinding::new(events, Duration::from_millis(1000));
        let (first, first_handle) = LoopbackClient::new("session-a");
        let (second, second_handle) = LoopbackClient::new("session-b");

        binding.bind(Box::new(first));
        binding.bind(Box::new(second));

        assert!(!first_handle.is_subscribed());
        assert!(second_handle.is_subscribed());
        assert_eq!(binding.session_id(), Some("session-b"));
    }

    #[test]
    fn test_unbind_releases_subscription() {
        let (events, _receiver) = mpsc::unbounded_channel();
        let mut binding = RemoteSessionBinding::new(events, Duration::from_millis(1000));
        let (client, handle) = LoopbackClient::new("session-a");
        binding.bind(Box::new(client));

        assert!(binding.unbind().is_some());
        assert!(!handle.is_subscribed());
        assert!(binding.unbind().is_none());
        assert!(binding.media_status().is_none());
    }
}
