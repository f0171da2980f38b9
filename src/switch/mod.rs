//! Provider switching across the three stores.
//!
//! - `coordinator.rs`: the switch state machine and read-side queries
//! - `lock.rs` / `gate.rs`: mutual exclusion and the reader gate
//! - `repair.rs`: bounded background repair of the mirror (Store C)
//! - `startup.rs`: one-shot reconciliation before serving

mod coordinator;
mod gate;
mod lock;
mod mirror;
mod outcome;
mod repair;
mod startup;
mod writer;

pub use coordinator::SwitchCoordinator;
pub use gate::{GateClosed, ReadinessGate};
pub use lock::{DualLock, DualLockGuard, LockError};
pub use outcome::{SwitchOutcome, SwitchState, SwitchStatus};
pub use repair::{RepairOutcome, RepairReport};
pub use startup::ConsistencyReport;
pub use writer::{AtomicFileWriter, ConfigWriter};
