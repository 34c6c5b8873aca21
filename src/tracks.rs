//! Track projection onto fixed renderer slots.
//!
//! The receiver reports a flat list of media tracks plus the ids that are
//! currently active. Locally we expose one track group per remote track and at
//! most one selection for each of the three renderer slots.

/// Number of renderer slots the player reports.
pub const RENDERER_COUNT: usize = 3;

const TEXT_APPLICATION_MIME_TYPES: [&str; 8] = [
    "application/ttml+xml",
    "application/x-subrip",
    "application/x-quicktime-tx3g",
    "application/x-mp4-vtt",
    "application/x-rawcc",
    "application/vobsub",
    "application/pgs",
    "application/cea-608",
];

/// Fixed renderer category a selection may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererSlot {
    Video,
    Audio,
    Text,
}

impl RendererSlot {
    pub const ALL: [RendererSlot; RENDERER_COUNT] =
        [RendererSlot::Video, RendererSlot::Audio, RendererSlot::Text];

    pub fn index(self) -> usize {
        match self {
            RendererSlot::Video => 0,
            RendererSlot::Audio => 1,
            RendererSlot::Text => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Infers the slot from a mime type; `None` for families no renderer handles.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime.starts_with("video/") {
            Some(RendererSlot::Video)
        } else if mime.starts_with("audio/") {
            Some(RendererSlot::Audio)
        } else if mime.starts_with("text/") || TEXT_APPLICATION_MIME_TYPES.contains(&mime.as_str())
        {
            Some(RendererSlot::Text)
        } else {
            None
        }
    }
}

/// Optional descriptive attributes of a remote track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackAttributes {
    pub name: Option<String>,
    pub language: Option<String>,
}

/// Track as described by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub id: u64,
    pub content_type: String,
    pub attributes: TrackAttributes,
}

/// Local group wrapping exactly one remote track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    pub track_id: u64,
    pub sample_mime_type: String,
    pub label: Option<String>,
    pub language: Option<String>,
}

impl From<&TrackDescriptor> for TrackGroup {
    fn from(descriptor: &TrackDescriptor) -> Self {
        Self {
            track_id: descriptor.id,
            sample_mime_type: descriptor.content_type.clone(),
            label: descriptor.attributes.name.clone(),
            language: descriptor.attributes.language.clone(),
        }
    }
}

/// Fixed selection of the single track in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSelection {
    pub group_index: usize,
    pub track_id: u64,
}

/// One optional selection per renderer slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackSelections([Option<TrackSelection>; RENDERER_COUNT]);

impl TrackSelections {
    pub fn get(&self, slot: RendererSlot) -> Option<&TrackSelection> {
        self.0[slot.index()].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RendererSlot, &TrackSelection)> {
        RendererSlot::ALL
            .into_iter()
            .zip(self.0.iter())
            .filter_map(|(slot, selection)| selection.as_ref().map(|selection| (slot, selection)))
    }

    fn fill_if_vacant(&mut self, slot: RendererSlot, selection: TrackSelection) {
        let entry = &mut self.0[slot.index()];
        if entry.is_none() {
            *entry = Some(selection);
        }
    }
}

/// Groups and selections computed from one media status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackProjection {
    pub groups: Vec<TrackGroup>,
    pub selections: TrackSelections,
}

impl TrackProjection {
    pub fn empty() -> Self {
        Self::default()
    }
}

pub struct TrackProjector;

impl TrackProjector {
    /// Builds one group per descriptor and selects active tracks, first match per slot.
    pub fn project(descriptors: &[TrackDescriptor], active_ids: &[u64]) -> TrackProjection {
        if descriptors.is_empty() {
            return TrackProjection::empty();
        }
        let mut projection = TrackProjection {
            groups: Vec::with_capacity(descriptors.len()),
            selections: TrackSelections::default(),
        };
        for (group_index, descriptor) in descriptors.iter().enumerate() {
            projection.groups.push(TrackGroup::from(descriptor));
            let Some(slot) = RendererSlot::for_content_type(&descriptor.content_type) else {
                continue;
            };
            if active_ids.contains(&descriptor.id) {
                projection.selections.fill_if_vacant(
                    slot,
                    TrackSelection {
                        group_index,
                        track_id: descriptor.id,
                    },
                );
            }
        }
        projection
    }
}
