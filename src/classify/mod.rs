//! Error classification: typed records, per-kind subscription, catch-all
//! dispatch.

mod classifier;
mod record;

pub use classifier::{ErrorCallbackFn, ErrorClassifier};
pub use record::{ErrorKind, ErrorRecord};
