#![forbid(unsafe_code)]

pub mod config;
pub mod dense;
pub mod error;
pub mod ffield;
pub mod grid;
pub mod host;
pub mod interpolate;

pub use config::{DenseArgs, FieldArgs};
pub use dense::DenseFix;
pub use error::{FixError, FixResult};
pub use ffield::FieldFix;
pub use grid::{ForceGrid, GridSpec, RefreshMode};
pub use host::{collect_group, HostAtoms};
