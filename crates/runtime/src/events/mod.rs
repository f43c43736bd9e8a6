//! Topic-based event bus for committed changes.
//!
//! The service publishes one [`HookEvent`] per committed change; the hook
//! dispatcher and any other consumer subscribe to the topics they need.

mod bus;
mod kinds;
pub mod payload;

pub use bus::{EventBus, HookEvent, Topic};
pub use kinds::HookEventKind;
