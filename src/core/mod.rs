//! Core application primitives (clock, monitor, scheduler, runtime, HTTP)

pub mod clock;
pub mod http;
pub mod monitor;
pub mod runtime;
pub mod scheduler;

pub use clock::*;
pub use http::*;
pub use monitor::*;
pub use runtime::*;
pub use scheduler::*;
