//! IO modules - external collaborator interfaces
//!
//! The engine talks to the world through three seams, each a trait with one
//! concrete implementation used by the binary and integration tests:
//! - `store` - persistence (`TripStore`, JSONL-backed `JsonlStore`)
//! - `notifier` - notification dispatch (`Notifier`, tracing-backed `LogNotifier`)
//! - `location` - fix acquisition (`LocationProvider`, trace-driven `ReplayProvider`)

pub mod location;
pub mod notifier;
pub mod store;

// Re-export commonly used types
pub use location::{FixStream, LocationProvider, ReplayProvider, SubscriptionProfile};
pub use notifier::{LogNotifier, Notifier};
pub use store::{JsonlStore, TripStore};
