//! solvelink task execution.
//!
//! [`TaskSession`] turns edited [`TaskInputs`] into solve calls on the first
//! suitable connection and surfaces the result as a
//! [`Trace`](solvelink_core::trace::Trace). Outcomes are reported only
//! through a [`TaskEventSink`].

mod error;
mod events;
mod inputs;
mod session;

pub use error::{Result, TaskError};
pub use events::{LoggingSink, TaskEventSink};
pub use inputs::TaskInputs;
pub use session::{TaskSession, TaskState};
