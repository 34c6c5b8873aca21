//! Uniform playback facade over a remote receiver.
//!
//! The receiver plays the media; this player mirrors its state locally. Local
//! intents (play, pause, seek, queue edits) are applied optimistically and sent
//! as remote commands, while status reports, progress ticks, acknowledgements
//! and custom messages arrive independently as [`RemoteEvent`]s. Every such
//! trigger runs the same reconciliation pass, which re-derives window index,
//! tracks and timeline and notifies listeners about what changed.
//!
//! All methods, listener callbacks and remote events are expected on one
//! thread; there is no internal locking.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::config::PlayerConfig;
use crate::listeners::{ListenerId, ListenerRegistry, PlayerListener};
use crate::message_channel::{ChannelMessage, MessageChannel};
use crate::notifications::AppEventSink;
use crate::persistence::PlayIntentStore;
use crate::protocol::{
    AppEvent, DiscontinuityReason, PlaybackState, PlayerEvent, RepeatMode,
};
use crate::remote::{
    CommandStatus, ItemId, MediaStatus, QueueItem, RemoteClient, RemoteCommand, RemoteEvent,
    RemoteEventReceiver, RemoteEventSender, RemotePlayerState, RequestId,
};
use crate::seek::{PendingSeek, SeekAckOutcome, SeekCoordinator};
use crate::session::RemoteSessionBinding;
use crate::timeline::{Timeline, TimelineTracker};
use crate::tracks::{
    RendererSlot, TrackGroup, TrackProjection, TrackProjector, TrackSelections, RENDERER_COUNT,
};

/// Last reported playback position, owned by one player instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSample {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub previous_position_ms: u64,
}

impl ProgressSample {
    fn record(&mut self, position_ms: u64) {
        self.previous_position_ms = self.position_ms;
        self.position_ms = position_ms;
    }
}

pub struct CastPlayer {
    session: RemoteSessionBinding,
    remote_events: RemoteEventReceiver,
    remote_events_sender: RemoteEventSender,
    channel: MessageChannel,
    seeks: SeekCoordinator,
    listeners: ListenerRegistry,
    notifier: Box<dyn AppEventSink>,
    intent_store: Box<dyn PlayIntentStore>,
    queue: Vec<QueueItem>,
    timeline: Timeline,
    tracks: TrackProjection,
    playback_state: PlaybackState,
    repeat_mode: RepeatMode,
    current_window_index: Option<usize>,
    play_when_ready: bool,
    progress: ProgressSample,
    waiting_for_initial_timeline: bool,
    is_live: bool,
}

impl CastPlayer {
    pub fn new(
        config: &PlayerConfig,
        notifier: Box<dyn AppEventSink>,
        intent_store: Box<dyn PlayIntentStore>,
    ) -> Self {
        let (remote_events_sender, remote_events) = mpsc::unbounded_channel();
        let progress_period = Duration::from_millis(config.progress_report_period_ms);
        Self {
            session: RemoteSessionBinding::new(remote_events_sender.clone(), progress_period),
            remote_events,
            remote_events_sender,
            channel: MessageChannel::new(config.namespace.clone()),
            seeks: SeekCoordinator::new(),
            listeners: ListenerRegistry::new(),
            notifier,
            intent_store,
            queue: Vec::new(),
            timeline: Timeline::empty(),
            tracks: TrackProjection::empty(),
            playback_state: PlaybackState::Ready,
            repeat_mode: RepeatMode::Off,
            current_window_index: None,
            play_when_ready: false,
            progress: ProgressSample::default(),
            waiting_for_initial_timeline: false,
            is_live: false,
        }
    }

    /// Channel through which session managers and clients report remote events.
    pub fn remote_event_sender(&self) -> RemoteEventSender {
        self.remote_events_sender.clone()
    }

    // Listeners.

    pub fn add_listener(&self, listener: Rc<dyn PlayerListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Shared handle to the listener set, usable from inside callbacks.
    pub fn listeners(&self) -> ListenerRegistry {
        self.listeners.clone()
    }

    // Session binding.

    pub fn is_session_available(&self) -> bool {
        self.session.is_bound()
    }

    /// Binds a remote session. Rebinding the already bound session does nothing.
    pub fn bind_session(&mut self, client: Box<dyn RemoteClient>) {
        if !self.session.bind(client) {
            return;
        }
        self.notifier.post(AppEvent::SessionAvailable);
        self.update_internal_state();
    }

    /// Drops the session; the last observed state stays queryable.
    ///
    /// Seeks still in flight are abandoned and will never report as processed.
    pub fn unbind_session(&mut self) {
        if self.session.unbind().is_none() {
            return;
        }
        if self.seeks.is_pending() {
            debug!(
                "CastPlayer: abandoning {} pending seek(s) on unbind",
                self.seeks.pending_count()
            );
        }
        self.notifier.post(AppEvent::SessionUnavailable);
    }

    /// Unbinds, ends the remote session and drops every listener.
    pub fn release(&mut self) {
        if let Some(mut client) = self.session.unbind() {
            client.end_session(false);
            self.notifier.post(AppEvent::SessionUnavailable);
        }
        self.listeners.clear();
        info!("CastPlayer: released");
    }

    // Remote event dispatch.

    /// Drains queued remote events. Returns how many were handled.
    pub fn pump_remote_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.remote_events.try_recv() {
                Ok(event) => {
                    self.handle_remote_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return handled,
            }
        }
    }

    pub fn handle_remote_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::SessionStarted(client) | RemoteEvent::SessionResumed(client) => {
                self.bind_session(client)
            }
            RemoteEvent::SessionEnded | RemoteEvent::SessionSuspended => self.unbind_session(),
            RemoteEvent::SessionStartFailed(status) => {
                error!("CastPlayer: session start failed. Error code {}", status);
            }
            RemoteEvent::SessionResumeFailed(status) => {
                error!("CastPlayer: session resume failed. Error code {}", status);
            }
            event if !self.session.is_bound() => {
                debug!("CastPlayer: dropping {:?} without a bound session", event);
            }
            RemoteEvent::StatusUpdated | RemoteEvent::QueueUpdated => {
                self.update_internal_state()
            }
            RemoteEvent::ProgressUpdated {
                position_ms,
                duration_ms,
            } => {
                self.progress.record(position_ms);
                if duration_ms > 0 {
                    self.progress.duration_ms = duration_ms;
                }
                self.update_internal_state();
            }
            RemoteEvent::SeekAcknowledged { request, status } => {
                if self.seeks.acknowledge(request, status) == SeekAckOutcome::Drained {
                    self.listeners.notify(&PlayerEvent::SeekProcessed);
                }
                self.update_internal_state();
            }
            RemoteEvent::CommandAcknowledged {
                request,
                command,
                status,
            } => log_command_result(request, &command, status),
            RemoteEvent::MessageReceived { namespace, payload } => {
                self.handle_message(&namespace, &payload)
            }
        }
    }

    fn handle_message(&mut self, namespace: &str, payload: &str) {
        debug!("CastPlayer: message received on {}: {}", namespace, payload);
        match self.channel.decode(namespace, payload) {
            Some(ChannelMessage::Progress {
                position_ms,
                duration_ms,
            }) => {
                self.progress.record(position_ms);
                self.progress.duration_ms = duration_ms;
                self.update_internal_state();
                self.notifier.post(AppEvent::Progress {
                    position_ms,
                    duration_ms,
                });
            }
            Some(ChannelMessage::Finish) => self.handle_finish(),
            None => {}
        }
    }

    fn handle_finish(&mut self) {
        match self.queue.first().cloned() {
            Some(first) => {
                self.load_item(first, Some(0));
            }
            None => warn!("CastPlayer: finish received with an empty queue"),
        }
        self.progress.record(0);
        self.seeks.retarget_position(0);
        self.play_when_ready = false;
        self.persist_play_intent();
        self.update_internal_state();
        self.notifier.post(AppEvent::CastFinish);
    }

    // Media queue manipulation.

    /// Loads a single item queue. Returns `None` without a session.
    pub fn load_item(&mut self, item: QueueItem, position_ms: Option<u64>) -> Option<RequestId> {
        self.load_items(vec![item], 0, position_ms, RepeatMode::Off)
    }

    /// Loads a media queue, starting at `start_index`; an unset position starts at 0.
    pub fn load_items(
        &mut self,
        items: Vec<QueueItem>,
        start_index: usize,
        position_ms: Option<u64>,
        repeat_mode: RepeatMode,
    ) -> Option<RequestId> {
        if !has_unique_ids(&items) {
            warn!("CastPlayer: rejecting queue load with repeated item ids");
            return None;
        }
        let client = self.session.client_mut()?;
        let command = RemoteCommand::QueueLoad {
            item_ids: items.iter().map(|item| item.item_id).collect(),
            start_index,
            repeat_mode,
            position_ms: position_ms.unwrap_or(0),
        };
        let request = client.send(command);
        self.waiting_for_initial_timeline = true;
        self.queue = items;
        Some(request)
    }

    /// Adopts a queue the receiver is already playing, without sending a load.
    pub fn resume_items(&mut self, items: Vec<QueueItem>) {
        if !self.session.is_bound() {
            return;
        }
        if !has_unique_ids(&items) {
            warn!("CastPlayer: rejecting resumed queue with repeated item ids");
            return;
        }
        self.waiting_for_initial_timeline = true;
        self.queue = items;
        self.maybe_update_timeline_and_notify();
    }

    /// Appends items to the queue.
    pub fn add_items(&mut self, items: Vec<QueueItem>) -> Option<RequestId> {
        self.insert_items(None, items)
    }

    /// Inserts items right before the period `before_period_id`, or appends when `None`.
    ///
    /// Returns `None` if there is no media queue, the period does not exist, or
    /// an item id is already queued or repeated within `items`.
    pub fn insert_items(
        &mut self,
        before_period_id: Option<ItemId>,
        items: Vec<QueueItem>,
    ) -> Option<RequestId> {
        self.remote_media_status()?;
        if let Some(period_id) = before_period_id {
            self.timeline.index_of_period(period_id)?;
        }
        let already_queued = items
            .iter()
            .any(|item| self.queue_index(item.item_id).is_some());
        if already_queued || !has_unique_ids(&items) {
            warn!("CastPlayer: rejecting insert of item ids already present in the queue");
            return None;
        }
        let request = self.session.client_mut()?.send(RemoteCommand::QueueInsert {
            item_ids: items.iter().map(|item| item.item_id).collect(),
            before_item_id: before_period_id,
        });
        let at = before_period_id
            .and_then(|id| self.queue_index(id))
            .unwrap_or(self.queue.len());
        self.queue.splice(at..at, items);
        self.maybe_update_timeline_and_notify();
        Some(request)
    }

    pub fn remove_item(&mut self, period_id: ItemId) -> Option<RequestId> {
        self.remote_media_status()?;
        self.timeline.index_of_period(period_id)?;
        let request = self
            .session
            .client_mut()?
            .send(RemoteCommand::QueueRemove(period_id));
        self.queue.retain(|item| item.item_id != period_id);
        self.maybe_update_timeline_and_notify();
        Some(request)
    }

    /// Moves an item to `new_index`, which must be within the current timeline.
    pub fn move_item(&mut self, period_id: ItemId, new_index: usize) -> Option<RequestId> {
        if new_index >= self.timeline.period_count() {
            warn!(
                "CastPlayer: move target {} outside timeline of {} periods",
                new_index,
                self.timeline.period_count()
            );
            return None;
        }
        self.remote_media_status()?;
        self.timeline.index_of_period(period_id)?;
        let request = self
            .session
            .client_mut()?
            .send(RemoteCommand::QueueMove {
                item_id: period_id,
                new_index,
            });
        if let Some(from) = self.queue_index(period_id) {
            let item = self.queue.remove(from);
            let to = new_index.min(self.queue.len());
            self.queue.insert(to, item);
        }
        self.maybe_update_timeline_and_notify();
        Some(request)
    }

    /// Item behind the period `period_id`, if a media queue exists and contains it.
    pub fn get_item(&self, period_id: ItemId) -> Option<&QueueItem> {
        self.remote_media_status()?;
        self.timeline.index_of_period(period_id)?;
        self.queue.iter().find(|item| item.item_id == period_id)
    }

    pub fn queue(&self) -> &[QueueItem] {
        &self.queue
    }

    fn queue_index(&self, item_id: ItemId) -> Option<usize> {
        self.queue.iter().position(|item| item.item_id == item_id)
    }

    // Playback control.

    pub fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.play_when_ready = play_when_ready;
        self.persist_play_intent();
        self.update_internal_state();
        let command = if play_when_ready {
            RemoteCommand::Play
        } else {
            RemoteCommand::Pause
        };
        if let Some(client) = self.session.client_mut() {
            client.send(command);
        }
        self.notifier.post(if play_when_ready {
            AppEvent::CastPlay
        } else {
            AppEvent::CastPause
        });
    }

    pub fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    /// Restores the persisted play intent and reconciles.
    pub fn sync_play_intent(&mut self) {
        self.play_when_ready = self.intent_store.load_play_intent();
        self.update_internal_state();
    }

    pub fn seek_to_default_position(&mut self) -> Option<RequestId> {
        self.seek_to(0)
    }

    pub fn seek_to_default_position_in(&mut self, window_index: usize) -> Option<RequestId> {
        self.seek_to_window(window_index, Some(0))
    }

    /// Seeks within the current window.
    pub fn seek_to(&mut self, position_ms: u64) -> Option<RequestId> {
        let window_index = self.current_window_index();
        self.seek_to_window(window_index, Some(position_ms))
    }

    /// Applies the seek locally, sends it and reports a seek discontinuity
    /// before the receiver acknowledges anything.
    pub fn seek_to_window(
        &mut self,
        window_index: usize,
        position_ms: Option<u64>,
    ) -> Option<RequestId> {
        if !self.session.is_bound() {
            debug!("CastPlayer: seek ignored without a bound session");
            return None;
        }
        let position_ms = position_ms.unwrap_or(0);
        self.progress.record(position_ms);
        self.seeks.begin(window_index, position_ms);
        let request = self
            .session
            .client_mut()
            .map(|client| client.send(RemoteCommand::Seek(position_ms)));
        self.listeners
            .notify(&PlayerEvent::PositionDiscontinuity(DiscontinuityReason::Seek));
        request
    }

    pub fn stop(&mut self) {
        self.playback_state = PlaybackState::Idle;
        if let Some(client) = self.session.client_mut() {
            client.send(RemoteCommand::Stop);
        }
    }

    /// Accepted locally only; the receiver's repeat mode is not changed.
    pub fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) {
        self.repeat_mode = repeat_mode;
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Asks the receiver application to switch subtitles.
    pub fn set_subtitle_language(&mut self, language: &str) -> Option<RequestId> {
        let namespace = self.channel.namespace().to_string();
        let client = self.session.client_mut()?;
        Some(client.send(RemoteCommand::SendMessage {
            namespace,
            payload: MessageChannel::encode_subtitle_request(language),
        }))
    }

    pub fn set_live(&mut self, is_live: bool) {
        self.is_live = is_live;
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    // State queries.

    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state
    }

    pub fn current_timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn current_track_groups(&self) -> &[TrackGroup] {
        &self.tracks.groups
    }

    pub fn current_track_selections(&self) -> &TrackSelections {
        &self.tracks.selections
    }

    pub fn renderer_count(&self) -> usize {
        RENDERER_COUNT
    }

    pub fn renderer_slot(&self, index: usize) -> Option<RendererSlot> {
        RendererSlot::from_index(index)
    }

    /// Pending seek target while a seek is in flight, else the last confirmed window.
    pub fn current_window_index(&self) -> usize {
        self.seeks
            .target_window_index()
            .or(self.current_window_index)
            .unwrap_or(0)
    }

    pub fn current_period_index(&self) -> usize {
        self.current_window_index()
    }

    pub fn next_window_index(&self) -> Option<usize> {
        self.timeline
            .next_window_index(self.current_window_index(), self.repeat_mode)
    }

    pub fn previous_window_index(&self) -> Option<usize> {
        self.timeline
            .previous_window_index(self.current_window_index(), self.repeat_mode)
    }

    pub fn has_next(&self) -> bool {
        self.next_window_index().is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous_window_index().is_some()
    }

    pub fn duration(&self) -> u64 {
        self.progress.duration_ms
    }

    /// Last position written by a seek, progress tick or progress message.
    pub fn current_position(&self) -> u64 {
        self.progress.position_ms
    }

    pub fn progress(&self) -> ProgressSample {
        self.progress
    }

    pub fn pending_seek(&self) -> PendingSeek {
        self.seeks.pending()
    }

    pub fn pending_seek_count(&self) -> u32 {
        self.seeks.pending_count()
    }

    pub fn is_waiting_for_initial_timeline(&self) -> bool {
        self.waiting_for_initial_timeline
    }

    // Reconciliation.

    fn remote_media_status(&self) -> Option<MediaStatus> {
        self.session.media_status()
    }

    fn persist_play_intent(&mut self) {
        if let Err(err) = self.intent_store.store_play_intent(self.play_when_ready) {
            warn!("CastPlayer: failed to persist play intent: {}", err);
        }
    }

    /// Re-derives the mirrored state from the receiver and notifies listeners.
    ///
    /// Tracks are updated before the timeline so timeline listeners observe the
    /// new track state. Without a session the state is left as it is.
    fn update_internal_state(&mut self) {
        if !self.session.is_bound() {
            return;
        }
        let media_status = self.remote_media_status();

        self.playback_state = fetch_playback_state(media_status.as_ref(), self.playback_state);
        self.listeners.notify(&PlayerEvent::StateChanged {
            play_when_ready: self.play_when_ready,
            playback_state: self.playback_state,
        });

        self.listeners
            .notify(&PlayerEvent::RepeatModeChanged(self.repeat_mode));

        if !self.seeks.is_pending() {
            let window_index = fetch_current_window_index(media_status.as_ref());
            if self.current_window_index != Some(window_index) {
                self.current_window_index = Some(window_index);
                self.listeners.notify(&PlayerEvent::PositionDiscontinuity(
                    DiscontinuityReason::PeriodTransition,
                ));
            }
        }

        let tracks = media_status
            .as_ref()
            .map(|status| TrackProjector::project(&status.media_tracks, &status.active_track_ids))
            .unwrap_or_default();
        if tracks != self.tracks {
            self.tracks = tracks;
            self.listeners.notify(&PlayerEvent::TracksChanged {
                groups: self.tracks.groups.clone(),
                selections: self.tracks.selections,
            });
        }

        self.maybe_update_timeline_and_notify();
    }

    fn maybe_update_timeline_and_notify(&mut self) {
        let timeline = match self.queue.first() {
            Some(anchor) => {
                TimelineTracker::project(&self.queue, &anchor.content_id, self.progress.duration_ms)
            }
            None => Timeline::empty(),
        };
        if timeline != self.timeline {
            self.timeline = timeline;
            self.waiting_for_initial_timeline = false;
            self.listeners
                .notify(&PlayerEvent::TimelineChanged(self.timeline.clone()));
        }
    }
}

/// Period ids must stay unique within a timeline.
fn has_unique_ids(items: &[QueueItem]) -> bool {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().all(|item| seen.insert(item.item_id))
}

/// Idle only when the receiver says so; buffering, playing and paused all map to ready.
fn fetch_playback_state(status: Option<&MediaStatus>, current: PlaybackState) -> PlaybackState {
    match status.map(|status| status.player_state) {
        Some(RemotePlayerState::Idle) => PlaybackState::Idle,
        Some(
            RemotePlayerState::Buffering | RemotePlayerState::Playing | RemotePlayerState::Paused,
        ) => PlaybackState::Ready,
        Some(RemotePlayerState::Unknown) | None => current,
    }
}

/// Index of the receiver's current item in its queue, 0 when unknown.
fn fetch_current_window_index(status: Option<&MediaStatus>) -> usize {
    status
        .and_then(|status| {
            status
                .current_item_id
                .and_then(|item_id| status.index_of_item(item_id))
        })
        .unwrap_or(0)
}

fn log_command_result(request: RequestId, command: &RemoteCommand, status: CommandStatus) {
    if status.is_success_or_replaced() {
        debug!("CastPlayer: command #{} {:?} completed", request, command);
    } else {
        error!(
            "CastPlayer: command #{} {:?} failed. Error code {}",
            request, command, status
        );
    }
}
