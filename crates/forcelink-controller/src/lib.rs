#![forbid(unsafe_code)]

pub mod dependent;
pub mod error;
pub mod grid;
pub mod independent;
pub mod registry;
pub mod runtime;
pub mod trace;

pub use dependent::{run_dependent, Readiness};
pub use error::{ControllerError, ControllerResult};
pub use grid::{run_grid, GridPhase, GridQuery};
pub use independent::run_independent;
pub use registry::Registry;
pub use runtime::{serve_world, ControllerConfig, IDLE_ABORT_CODE};
pub use trace::TraceEmitter;
