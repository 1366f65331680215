use std::sync::{Arc, RwLock};

use crate::analytics::{CycleReport, Phase};

/// The most recent processed cycle. Older cycles are not retained.
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    pub sequence: u64,
    pub report: CycleReport,
    pub frame_jpeg: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct SnapshotState {
    latest: Option<CycleSnapshot>,
    phase: Option<Phase>,
    cycles_processed: u64,
    source_ended: bool,
}

pub struct SnapshotStore {
    state: Arc<RwLock<SnapshotState>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatus {
    pub phase: Option<Phase>,
    pub cycles_processed: u64,
    pub latest_sequence: Option<u64>,
    pub source_ended: bool,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SnapshotState::default())),
        }
    }

    pub fn publish(&self, report: CycleReport, frame_jpeg: Option<Vec<u8>>) -> u64 {
        let mut state = self.state.write().unwrap();
        state.cycles_processed += 1;
        let sequence = state.cycles_processed;
        state.phase = Some(report.phase);
        state.latest = Some(CycleSnapshot {
            sequence,
            report,
            frame_jpeg,
        });
        sequence
    }

    pub fn mark_source_ended(&self) {
        self.state.write().unwrap().source_ended = true;
    }

    pub fn latest(&self) -> Option<CycleSnapshot> {
        self.state.read().unwrap().latest.clone()
    }

    pub fn latest_frame(&self) -> Option<Vec<u8>> {
        self.state
            .read()
            .unwrap()
            .latest
            .as_ref()
            .and_then(|s| s.frame_jpeg.clone())
    }

    pub fn status(&self) -> StoreStatus {
        let state = self.state.read().unwrap();
        StoreStatus {
            phase: state.phase,
            cycles_processed: state.cycles_processed,
            latest_sequence: state.latest.as_ref().map(|s| s.sequence),
            source_ended: state.source_ended,
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SnapshotStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::FrameCounts;

    fn report(phase: Phase, person: u32) -> CycleReport {
        CycleReport {
            phase,
            counts: FrameCounts {
                person,
                child: 0,
                animal: 0,
            },
            classifications: Vec::new(),
        }
    }

    #[test]
    fn test_only_latest_cycle_kept() {
        let store = SnapshotStore::new();
        assert!(store.latest().is_none());
        assert_eq!(store.status().phase, None);

        assert_eq!(store.publish(report(Phase::WarmUp, 0), None), 1);
        assert_eq!(
            store.publish(report(Phase::Detecting, 2), Some(vec![0xFF, 0xD8])),
            2
        );

        let latest = store.latest().unwrap();
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.report.counts.person, 2);
        assert_eq!(store.latest_frame(), Some(vec![0xFF, 0xD8]));

        let status = store.status();
        assert_eq!(status.phase, Some(Phase::Detecting));
        assert_eq!(status.cycles_processed, 2);
        assert_eq!(status.latest_sequence, Some(2));
        assert!(!status.source_ended);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SnapshotStore::new();
        let reader = store.clone();
        store.publish(report(Phase::Detecting, 1), None);
        store.mark_source_ended();
        assert_eq!(reader.status().cycles_processed, 1);
        assert!(reader.status().source_ended);
        assert!(reader.latest_frame().is_none());
    }
}
