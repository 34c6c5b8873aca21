//! Remote transport collaborator.
//!
//! The player never talks to a receiver device directly. It drives a
//! [`RemoteClient`] that sends commands and later reports status, progress and
//! acknowledgements back as [`RemoteEvent`]s through the channel handed over
//! on subscription.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::protocol::RepeatMode;
use crate::tracks::TrackDescriptor;

/// Identifier the receiver assigns to a queue item. Periods reuse it.
pub type ItemId = u32;
/// Identifier of one command sent to the receiver.
pub type RequestId = u64;

pub type RemoteEventSender = UnboundedSender<RemoteEvent>;
pub type RemoteEventReceiver = UnboundedReceiver<RemoteEvent>;

/// Display metadata attached to a queue item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
}

/// One entry of the media queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub item_id: ItemId,
    pub content_id: String,
    pub media_uri: String,
    pub metadata: MediaMetadata,
}

/// Player state reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemotePlayerState {
    #[default]
    Unknown,
    Idle,
    Buffering,
    Playing,
    Paused,
}

/// Last media status observed on the receiver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStatus {
    pub player_state: RemotePlayerState,
    pub current_item_id: Option<ItemId>,
    /// Item ids of the remote queue, in queue order.
    pub queue_item_ids: Vec<ItemId>,
    pub media_tracks: Vec<TrackDescriptor>,
    pub active_track_ids: Vec<u64>,
}

impl MediaStatus {
    pub fn index_of_item(&self, item_id: ItemId) -> Option<usize> {
        self.queue_item_ids.iter().position(|id| *id == item_id)
    }
}

/// Status code carried by a command acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandStatus(pub i32);

impl CommandStatus {
    pub const SUCCESS: CommandStatus = CommandStatus(0);
    pub const INTERRUPTED: CommandStatus = CommandStatus(14);
    pub const TIMEOUT: CommandStatus = CommandStatus(15);
    pub const NETWORK_ERROR: CommandStatus = CommandStatus(7);
    pub const INTERNAL_ERROR: CommandStatus = CommandStatus(8);
    pub const INVALID_REQUEST: CommandStatus = CommandStatus(2001);
    pub const CANCELED: CommandStatus = CommandStatus(2002);
    pub const FAILED: CommandStatus = CommandStatus(2100);
    pub const REPLACED: CommandStatus = CommandStatus(2103);

    /// Whether the receiver accepted the command or superseded it with a newer one.
    pub fn is_success_or_replaced(self) -> bool {
        self == Self::SUCCESS || self == Self::REPLACED
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "SUCCESS",
            7 => "NETWORK_ERROR",
            8 => "INTERNAL_ERROR",
            14 => "INTERRUPTED",
            15 => "TIMEOUT",
            2001 => "INVALID_REQUEST",
            2002 => "CANCELED",
            2100 => "FAILED",
            2103 => "REPLACED",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Commands the player issues to the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    QueueLoad {
        item_ids: Vec<ItemId>,
        start_index: usize,
        repeat_mode: RepeatMode,
        position_ms: u64,
    },
    QueueInsert {
        item_ids: Vec<ItemId>,
        before_item_id: Option<ItemId>,
    },
    QueueRemove(ItemId),
    QueueMove {
        item_id: ItemId,
        new_index: usize,
    },
    Seek(u64),
    Play,
    Pause,
    Stop,
    SendMessage {
        namespace: String,
        payload: String,
    },
}

/// Transport to one remote playback session.
///
/// Every command returns immediately with a request id; completion is
/// reported later through the subscribed event channel.
pub trait RemoteClient {
    /// Stable identity of the underlying session.
    fn session_id(&self) -> &str;
    /// Latest media status, if the receiver has reported one.
    fn media_status(&self) -> Option<MediaStatus>;
    /// Starts delivering status and periodic progress events.
    fn subscribe(&mut self, events: RemoteEventSender, progress_period: Duration);
    fn unsubscribe(&mut self);
    fn send(&mut self, command: RemoteCommand) -> RequestId;
    /// Ends the remote session, optionally stopping the receiver application.
    fn end_session(&mut self, stop_casting: bool);
}

/// Everything that can happen on the remote side, funneled into one dispatch point.
pub enum RemoteEvent {
    StatusUpdated,
    QueueUpdated,
    SessionStarted(Box<dyn RemoteClient>),
    SessionResumed(Box<dyn RemoteClient>),
    SessionEnded,
    SessionSuspended,
    SessionStartFailed(CommandStatus),
    SessionResumeFailed(CommandStatus),
    ProgressUpdated {
        position_ms: u64,
        duration_ms: u64,
    },
    SeekAcknowledged {
        request: RequestId,
        status: CommandStatus,
    },
    CommandAcknowledged {
        request: RequestId,
        command: RemoteCommand,
        status: CommandStatus,
    },
    MessageReceived {
        namespace: String,
        payload: String,
    },
}

impl fmt::Debug for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteEvent::StatusUpdated => write!(f, "StatusUpdated"),
            RemoteEvent::QueueUpdated => write!(f, "QueueUpdated"),
            RemoteEvent::SessionStarted(client) => {
                write!(f, "SessionStarted({})", client.session_id())
            }
            RemoteEvent::SessionResumed(client) => {
                write!(f, "SessionResumed({})", client.session_id())
            }
            RemoteEvent::SessionEnded => write!(f, "SessionEnded"),
            RemoteEvent::SessionSuspended => write!(f, "SessionSuspended"),
            RemoteEvent::SessionStartFailed(status) => write!(f, "SessionStartFailed({status})"),
            RemoteEvent::SessionResumeFailed(status) => {
                write!(f, "SessionResumeFailed({status})")
            }
            RemoteEvent::ProgressUpdated {
                position_ms,
                duration_ms,
            } => write!(f, "ProgressUpdated({position_ms}/{duration_ms})"),
            RemoteEvent::SeekAcknowledged { request, status } => {
                write!(f, "SeekAcknowledged(#{request}, {status})")
            }
            RemoteEvent::CommandAcknowledged {
                request,
                command,
                status,
            } => write!(f, "CommandAcknowledged(#{request}, {command:?}, {status})"),
            RemoteEvent::MessageReceived { namespace, payload } => {
                write!(f, "MessageReceived({namespace}, {payload})")
            }
        }
    }
}
