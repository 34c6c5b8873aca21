//! Remote-playback facade for cast receivers.
//!
//! [`CastPlayer`] presents a remote receiver session through the same surface a
//! local player offers: play/pause intent, seeking, a media queue exposed as a
//! timeline, track groups and listener notifications.

pub mod config;
pub mod listeners;
pub mod loopback;
pub mod message_channel;
pub mod notifications;
pub mod persistence;
pub mod player;
pub mod protocol;
pub mod remote;
pub mod seek;
pub mod session;
pub mod timeline;
pub mod tracks;

pub use config::{load_config, PlayerConfig};
pub use listeners::{ListenerId, ListenerRegistry, PlayerListener};
pub use notifications::AppEventSink;
pub use persistence::{FilePlayIntentStore, MemoryPlayIntentStore, PlayIntentStore};
pub use player::{CastPlayer, ProgressSample};
pub use protocol::{AppEvent, DiscontinuityReason, PlaybackState, PlayerEvent, RepeatMode};
pub use remote::{
    CommandStatus, MediaStatus, QueueItem, RemoteClient, RemoteCommand, RemoteEvent,
};
pub use timeline::{Period, Timeline};
pub use tracks::{RendererSlot, TrackGroup, TrackSelections};
