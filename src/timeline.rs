//! Timeline reconstruction from the flat media queue.
//!
//! The receiver only exposes an ordered list of queue items. Each item maps to
//! exactly one period and one window; there are no ad groups and no
//! multi-period windows.

use crate::protocol::RepeatMode;
use crate::remote::{ItemId, QueueItem};

/// One playable unit of the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    /// Same as the queue item id.
    pub id: ItemId,
    /// Known only for the period playing the anchor content.
    pub duration_ms: Option<u64>,
    pub content_id: String,
}

/// Immutable snapshot of the queue as a sequence of periods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    periods: Vec<Period>,
}

impl Timeline {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    /// Windows are 1:1 with periods.
    pub fn window_count(&self) -> usize {
        self.periods.len()
    }

    pub fn period(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    pub fn index_of_period(&self, id: ItemId) -> Option<usize> {
        self.periods.iter().position(|period| period.id == id)
    }

    pub fn next_window_index(&self, current: usize, repeat_mode: RepeatMode) -> Option<usize> {
        if self.is_empty() || current >= self.window_count() {
            return None;
        }
        match repeat_mode {
            RepeatMode::One => Some(current),
            RepeatMode::All if current + 1 == self.window_count() => Some(0),
            _ if current + 1 < self.window_count() => Some(current + 1),
            _ => None,
        }
    }

    pub fn previous_window_index(&self, current: usize, repeat_mode: RepeatMode) -> Option<usize> {
        if self.is_empty() || current >= self.window_count() {
            return None;
        }
        match repeat_mode {
            RepeatMode::One => Some(current),
            RepeatMode::All if current == 0 => Some(self.window_count() - 1),
            _ => current.checked_sub(1),
        }
    }
}

/// Builds timelines from queue items.
pub struct TimelineTracker;

impl TimelineTracker {
    /// Projects the queue onto a timeline, preserving queue order.
    ///
    /// `duration_ms` is attached to every period whose content id matches
    /// `anchor_content_id`; the receiver reports a single duration, so the other
    /// periods stay unknown. An empty queue yields the empty timeline.
    pub fn project(items: &[QueueItem], anchor_content_id: &str, duration_ms: u64) -> Timeline {
        let periods = items
            .iter()
            .map(|item| Period {
                id: item.item_id,
                duration_ms: (item.content_id == anchor_content_id && duration_ms > 0)
                    .then_some(duration_ms),
                content_id: item.content_id.clone(),
            })
            .collect();
        Timeline { periods }
    }
}

#[cfg(test)]
mod tests {
    use super::{Timeline, TimelineTracker};
    use crate::protocol::RepeatMode;
    use crate::remote::{MediaMetadata, QueueItem};

    fn item(item_id: u32, content_id: &str) -> QueueItem {
        QueueItem {
            item_id,
            content_id: content_id.to_string(),
            media_uri: format!("https://media.example/{content_id}.m3u8"),
            metadata: MediaMetadata::default(),
        }
    }

    #[test]
    fn test_empty_queue_projects_to_empty_timeline() {
        let timeline = TimelineTracker::project(&[], "a", 10_000);
        assert!(timeline.is_empty());
        assert_eq!(timeline, Timeline::empty());
    }

    #[test]
    fn test_project_preserves_queue_order_and_ids() {
        let items = vec![item(5, "a"), item(2, "b"), item(9, "c")];
        let timeline = TimelineTracker::project(&items, "a", 60_000);

        let ids: Vec<u32> = timeline.periods().iter().map(|period| period.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
        assert_eq!(timeline.period(0).and_then(|p| p.duration_ms), Some(60_000));
        assert_eq!(timeline.period(1).and_then(|p| p.duration_ms), None);
        assert_eq!(timeline.index_of_period(9), Some(2));
        assert_eq!(timeline.index_of_period(4), None);
    }

    #[test]
    fn test_project_is_pure_for_equal_inputs() {
        let first = TimelineTracker::project(&[item(1, "a"), item(2, "b")], "a", 1_000);
        let second = TimelineTracker::project(&[item(1, "a"), item(2, "b")], "a", 1_000);
        assert_eq!(first, second);

        let reordered = TimelineTracker::project(&[item(2, "b"), item(1, "a")], "a", 1_000);
        assert_ne!(first, reordered);
    }

    #[test]
    fn test_duration_change_changes_timeline() {
        let items = vec![item(1, "a")];
        assert_ne!(
            TimelineTracker::project(&items, "a", 1_000),
            TimelineTracker::project(&items, "a", 2_000)
        );
    }

    #[test]
    fn test_window_navigation_honors_repeat_mode() {
        let timeline = TimelineTracker::project(&[item(1, "a"), item(2, "b"), item(3, "c")], "a", 0);

        assert_eq!(timeline.next_window_index(0, RepeatMode::Off), Some(1));
        assert_eq!(timeline.next_window_index(2, RepeatMode::Off), None);
        assert_eq!(timeline.next_window_index(2, RepeatMode::All), Some(0));
        assert_eq!(timeline.next_window_index(1, RepeatMode::One), Some(1));
        assert_eq!(timeline.previous_window_index(0, RepeatMode::Off), None);
        assert_eq!(timeline.previous_window_index(0, RepeatMode::All), Some(2));
        assert_eq!(Timeline::empty().next_window_index(0, RepeatMode::All), None);
    }
}
