//! Optimistic seek bookkeeping.
//!
//! Seeks are applied locally first and confirmed later. Acknowledgements are
//! matched by counting only: every ack drains one pending seek, whichever
//! request it belongs to, and the pending target is cleared once the count
//! reaches zero.

use log::{error, warn};

use crate::remote::{CommandStatus, RequestId};

/// In-flight seek requests not yet acknowledged by the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSeek {
    pub count: u32,
    pub target_window_index: Option<usize>,
    pub target_position_ms: Option<u64>,
}

/// Result of applying one acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekAckOutcome {
    /// More seeks are still in flight.
    Pending(u32),
    /// The last pending seek was acknowledged; the target has been cleared.
    Drained,
    /// No seek was pending; the acknowledgement was dropped.
    Unmatched,
}

#[derive(Debug, Default)]
pub struct SeekCoordinator {
    pending: PendingSeek,
}

impl SeekCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> PendingSeek {
        self.pending
    }

    pub fn pending_count(&self) -> u32 {
        self.pending.count
    }

    pub fn is_pending(&self) -> bool {
        self.pending.count > 0
    }

    pub fn target_window_index(&self) -> Option<usize> {
        self.pending.target_window_index
    }

    pub fn target_position_ms(&self) -> Option<u64> {
        self.pending.target_position_ms
    }

    /// Registers a new seek; the latest target wins while seeks are coalesced.
    pub fn begin(&mut self, window_index: usize, position_ms: u64) {
        self.pending.count = self.pending.count.saturating_add(1);
        self.pending.target_window_index = Some(window_index);
        self.pending.target_position_ms = Some(position_ms);
    }

    /// Overwrites the pending target position without registering a new seek.
    pub fn retarget_position(&mut self, position_ms: u64) {
        if self.is_pending() {
            self.pending.target_position_ms = Some(position_ms);
        }
    }

    /// Drains one pending seek. Failed statuses are logged but still drain.
    pub fn acknowledge(&mut self, request: RequestId, status: CommandStatus) -> SeekAckOutcome {
        if !status.is_success_or_replaced() {
            error!(
                "SeekCoordinator: seek #{} failed. Error code {}",
                request, status
            );
        }
        if self.pending.count == 0 {
            warn!(
                "SeekCoordinator: acknowledgement for seek #{} arrived with no seek pending",
                request
            );
            return SeekAckOutcome::Unmatched;
        }
        self.pending.count -= 1;
        if self.pending.count == 0 {
            self.pending = PendingSeek::default();
            SeekAckOutcome::Drained
        } else {
            SeekAckOutcome::Pending(self.pending.count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PendingSeek, SeekAckOutcome, SeekCoordinator};
    use crate::remote::CommandStatus;

    #[test]
    fn test_seeks_coalesce_to_latest_target() {
        let mut seeks = SeekCoordinator::new();
        seeks.begin(0, 1_000);
        seeks.begin(2, 5_000);
        seeks.begin(1, 7_000);

        assert_eq!(seeks.pending_count(), 3);
        assert_eq!(seeks.target_window_index(), Some(1));
        assert_eq!(seeks.target_position_ms(), Some(7_000));
    }

    #[test]
    fn test_any_status_drains_the_counter() {
        let mut seeks = SeekCoordinator::new();
        seeks.begin(0, 1_000);
        seeks.begin(0, 2_000);
        seeks.begin(0, 3_000);

        assert_eq!(
            seeks.acknowledge(1, CommandStatus::FAILED),
            SeekAckOutcome::Pending(2)
        );
        assert_eq!(
            seeks.acknowledge(2, CommandStatus::REPLACED),
            SeekAckOutcome::Pending(1)
        );
        assert_eq!(
            seeks.acknowledge(3, CommandStatus::SUCCESS),
            SeekAckOutcome::Drained
        );
        assert_eq!(seeks.pending(), PendingSeek::default());
    }

    #[test]
    fn test_extra_acknowledgements_are_tolerated() {
        let mut seeks = SeekCoordinator::new();
        assert_eq!(
            seeks.acknowledge(9, CommandStatus::SUCCESS),
            SeekAckOutcome::Unmatched
        );
        assert_eq!(seeks.pending_count(), 0);
        assert_eq!(seeks.target_window_index(), None);
    }

    #[test]
    fn test_retarget_only_applies_while_pending() {
        let mut seeks = SeekCoordinator::new();
        seeks.retarget_position(0);
        assert_eq!(seeks.target_position_ms(), None);

        seeks.begin(1, 4_000);
        seeks.retarget_position(0);
        assert_eq!(seeks.target_position_ms(), Some(0));
        assert_eq!(seeks.pending_count(), 1);
    }
}
