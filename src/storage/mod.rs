mod snapshot;

pub use snapshot::{CycleSnapshot, SnapshotStore};
