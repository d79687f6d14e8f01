//! Event & command bus (§4.7): the only channel through which the HTTP/SSE
//! boundary (C8) talks to the frame pipeline. Grounded on the teacher's
//! `tokio::sync::mpsc` monitor-task shape in `recording/auto_clip_manager.rs`.

pub mod command_bus;
pub mod error;
pub mod event_bus;

pub use command_bus::{CommandBus, CommandHandler, CommandRegistry};
pub use error::{BusError, Result};
pub use event_bus::{Event, EventBus, Subscription};
