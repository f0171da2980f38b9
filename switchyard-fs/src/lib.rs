//! Filesystem primitives shared by the switch coordinator.
//!
//! - `atomic`: crash-safe whole-file replacement (temp file + fsync + rename)
//! - `flock`: blocking cross-process advisory lock on a lock file

pub mod atomic;
pub mod flock;

pub use atomic::{json_bytes, write_atomic};
pub use flock::FileLock;
