//! In-process receiver used by the demo binary and tests.
//!
//! `LoopbackClient` implements [`RemoteClient`] without any network; the paired
//! [`LoopbackHandle`] plays the receiver's part: it inspects issued commands,
//! edits the media status and emits events back to the subscribed player.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use log::debug;

use crate::remote::{
    CommandStatus, MediaStatus, RemoteClient, RemoteCommand, RemoteEvent, RemoteEventSender,
    RemotePlayerState, RequestId,
};

#[derive(Default)]
struct LoopbackState {
    media_status: Option<MediaStatus>,
    sink: Option<RemoteEventSender>,
    progress_period: Option<Duration>,
    subscribe_calls: usize,
    commands: Vec<(RequestId, RemoteCommand)>,
    next_request_id: RequestId,
    unacknowledged_seeks: VecDeque<RequestId>,
    session_ended: Option<bool>,
    position_ms: u64,
    duration_ms: u64,
}

impl LoopbackState {
    fn apply(&mut self, command: &RemoteCommand) {
        let status = self.media_status.get_or_insert_with(MediaStatus::default);
        match command {
            RemoteCommand::QueueLoad {
                item_ids,
                start_index,
                position_ms,
                ..
            } => {
                status.queue_item_ids = item_ids.clone();
                status.current_item_id = item_ids.get(*start_index).copied();
                status.player_state = RemotePlayerState::Buffering;
                self.position_ms = *position_ms;
            }
            RemoteCommand::QueueInsert {
                item_ids,
                before_item_id,
            } => {
                let at = before_item_id
                    .and_then(|id| status.index_of_item(id))
                    .unwrap_or(status.queue_item_ids.len());
                for (offset, id) in item_ids.iter().enumerate() {
                    status.queue_item_ids.insert(at + offset, *id);
                }
            }
            RemoteCommand::QueueRemove(item_id) => {
                status.queue_item_ids.retain(|id| id != item_id);
            }
            RemoteCommand::QueueMove { item_id, new_index } => {
                if let Some(from) = status.index_of_item(*item_id) {
                    let id = status.queue_item_ids.remove(from);
                    let to = (*new_index).min(status.queue_item_ids.len());
                    status.queue_item_ids.insert(to, id);
                }
            }
            RemoteCommand::Seek(position_ms) => self.position_ms = *position_ms,
            RemoteCommand::Play => status.player_state = RemotePlayerState::Playing,
            RemoteCommand::Pause => status.player_state = RemotePlayerState::Paused,
            RemoteCommand::Stop => status.player_state = RemotePlayerState::Idle,
            RemoteCommand::SendMessage { .. } => {}
        }
    }
}

pub struct LoopbackClient {
    session_id: String,
    state: Rc<RefCell<LoopbackState>>,
}

/// Receiver-side controls for a [`LoopbackClient`].
#[derive(Clone)]
pub struct LoopbackHandle {
    state: Rc<RefCell<LoopbackState>>,
}

impl LoopbackClient {
    pub fn new(session_id: &str) -> (LoopbackClient, LoopbackHandle) {
        let state = Rc::new(RefCell::new(LoopbackState {
            next_request_id: 1,
            ..LoopbackState::default()
        }));
        let client = LoopbackClient {
            session_id: session_id.to_string(),
            state: Rc::clone(&state),
        };
        (client, LoopbackHandle { state })
    }

    /// Second client object for the same session.
    pub fn duplicate(&self) -> LoopbackClient {
        LoopbackClient {
            session_id: self.session_id.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl RemoteClient for LoopbackClient {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn media_status(&self) -> Option<MediaStatus> {
        self.state.borrow().media_status.clone()
    }

    fn subscribe(&mut self, events: RemoteEventSender, progress_period: Duration) {
        let mut state = self.state.borrow_mut();
        state.sink = Some(events);
        state.progress_period = Some(progress_period);
        state.subscribe_calls += 1;
    }

    fn unsubscribe(&mut self) {
        let mut state = self.state.borrow_mut();
        state.sink = None;
        state.progress_period = None;
    }

    fn send(&mut self, command: RemoteCommand) -> RequestId {
        let mut state = self.state.borrow_mut();
        let request = state.next_request_id;
        state.next_request_id += 1;
        debug!("LoopbackClient: #{} {:?}", request, command);
        state.apply(&command);
        if matches!(command, RemoteCommand::Seek(_)) {
            state.unacknowledged_seeks.push_back(request);
        }
        state.commands.push((request, command));
        request
    }

    fn end_session(&mut self, stop_casting: bool) {
        self.state.borrow_mut().session_ended = Some(stop_casting);
    }
}

impl LoopbackHandle {
    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().sink.is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.borrow().subscribe_calls
    }

    pub fn progress_period(&self) -> Option<Duration> {
        self.state.borrow().progress_period
    }

    /// `Some(stop_casting)` once the player ended the session.
    pub fn session_ended(&self) -> Option<bool> {
        self.state.borrow().session_ended
    }

    pub fn commands(&self) -> Vec<RemoteCommand> {
        self.state
            .borrow()
            .commands
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    pub fn media_status(&self) -> Option<MediaStatus> {
        self.state.borrow().media_status.clone()
    }

    pub fn unacknowledged_seek_count(&self) -> usize {
        self.state.borrow().unacknowledged_seeks.len()
    }

    /// Sends `event` to the subscribed player. Returns `false` when nobody listens.
    pub fn emit(&self, event: RemoteEvent) -> bool {
        let state = self.state.borrow();
        match state.sink.as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    /// Applies `edit` to the current media status and reports it.
    pub fn update_media_status<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut MediaStatus),
    {
        {
            let mut state = self.state.borrow_mut();
            edit(state.media_status.get_or_insert_with(MediaStatus::default));
        }
        self.emit(RemoteEvent::StatusUpdated)
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.state.borrow_mut().duration_ms = duration_ms;
    }

    /// Moves playback forward and emits one progress tick.
    pub fn advance(&self, elapsed_ms: u64) -> bool {
        let (position_ms, duration_ms) = {
            let mut state = self.state.borrow_mut();
            let playing = state
                .media_status
                .as_ref()
                .is_some_and(|status| status.player_state == RemotePlayerState::Playing);
            if playing {
                state.position_ms = state.position_ms.saturating_add(elapsed_ms);
                if state.duration_ms > 0 {
                    state.position_ms = state.position_ms.min(state.duration_ms);
                }
            }
            (state.position_ms, state.duration_ms)
        };
        self.emit(RemoteEvent::ProgressUpdated {
            position_ms,
            duration_ms,
        })
    }

    /// Acknowledges the oldest unacknowledged seek.
    pub fn acknowledge_next_seek(&self, status: CommandStatus) -> bool {
        let request = self.state.borrow_mut().unacknowledged_seeks.pop_front();
        match request {
            Some(request) => self.emit(RemoteEvent::SeekAcknowledged { request, status }),
            None => false,
        }
    }

    pub fn acknowledge_all_seeks(&self, status: CommandStatus) -> usize {
        let mut acknowledged = 0;
        while self.acknowledge_next_seek(status) {
            acknowledged += 1;
        }
        acknowledged
    }

    pub fn receive_message(&self, namespace: &str, payload: &str) -> bool {
        self.emit(RemoteEvent::MessageReceived {
            namespace: namespace.to_string(),
            payload: payload.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::LoopbackClient;
    use crate::protocol::RepeatMode;
    use crate::remote::{CommandStatus, RemoteClient, RemoteCommand, RemoteEvent};

    #[test]
    fn test_queue_commands_update_media_status() {
        let (mut client, handle) = LoopbackClient::new("loop");
        client.send(RemoteCommand::QueueLoad {
            item_ids: vec![1, 2, 3],
            start_index: 1,
            repeat_mode: RepeatMode::Off,
            position_ms: 0,
        });
        client.send(RemoteCommand::QueueMove {
            item_id: 3,
            new_index: 0,
        });
        client.send(RemoteCommand::QueueRemove(1));
        client.send(RemoteCommand::QueueInsert {
            item_ids: vec![8],
            before_item_id: Some(2),
        });

        let status = handle.media_status().expect("status after load");
        assert_eq!(status.queue_item_ids, vec![3, 8, 2]);
        assert_eq!(status.current_item_id, Some(2));
        assert_eq!(handle.commands().len(), 4);
    }

    #[test]
    fn test_seek_acks_follow_request_order() {
        let (mut client, handle) = LoopbackClient::new("loop");
        let (events, mut receiver) = mpsc::unbounded_channel();
        client.subscribe(events, Duration::from_millis(1000));

        let first = client.send(RemoteCommand::Seek(1_000));
        let second = client.send(RemoteCommand::Seek(2_000));
        assert_eq!(handle.unacknowledged_seek_count(), 2);
        assert_eq!(handle.acknowledge_all_seeks(CommandStatus::SUCCESS), 2);

        let mut acknowledged = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let RemoteEvent::SeekAcknowledged { request, .. } = event {
                acknowledged.push(request);
            }
        }
        assert_eq!(acknowledged, vec![first, second]);
    }

    #[test]
    fn test_emit_without_subscription_reports_false() {
        let (_client, handle) = LoopbackClient::new("loop");
        assert!(!handle.advance(1000));
        assert!(!handle.receive_message("ns", "{}"));
    }
}
