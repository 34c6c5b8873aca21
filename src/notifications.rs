//! Application notification collaborator.
//!
//! Domain events are fire-and-forget: the player never waits on, or reacts to,
//! delivery failures.

use tokio::sync::broadcast::Sender;

use crate::protocol::AppEvent;

pub trait AppEventSink {
    fn post(&self, event: AppEvent);
}

impl AppEventSink for Sender<AppEvent> {
    fn post(&self, event: AppEvent) {
        // No receivers is fine; the surrounding app may not be listening yet.
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::{self, error::TryRecvError};

    use super::AppEventSink;
    use crate::protocol::AppEvent;

    #[test]
    fn test_broadcast_sink_delivers_in_order() {
        let (sender, mut receiver) = broadcast::channel(16);
        sender.post(AppEvent::CastPlay);
        sender.post(AppEvent::Progress {
            position_ms: 10,
            duration_ms: 20,
        });

        assert_eq!(receiver.try_recv(), Ok(AppEvent::CastPlay));
        assert_eq!(
            receiver.try_recv(),
            Ok(AppEvent::Progress {
                position_ms: 10,
                duration_ms: 20,
            })
        );
        assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_post_without_receivers_does_not_fail() {
        let (sender, receiver) = broadcast::channel::<AppEvent>(4);
        drop(receiver);
        sender.post(AppEvent::CastFinish);
    }
}
