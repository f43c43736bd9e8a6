//! Background workers owned by the runtime.

mod dispatcher;

pub use dispatcher::{Command, HookDispatcher};
