//! Core traits and types for cooperative device emulation.
//!
//! Everything runs on one thread, driven by time-ordered events. A device
//! that needs something to happen "later" never spawns activity of its own:
//! it enqueues a zero-delay event on the machine's scheduler and returns.

mod node;
mod observable;
mod sched;
mod source;
mod state;

pub use node::{NodeId, NodeSink};
pub use observable::{Observable, Value};
pub use sched::{EventQueue, Scheduler, SyncEvent};
pub use source::{ByteSource, DeviceRegistry, SourceHandle};
pub use state::{Persist, SaveState};
