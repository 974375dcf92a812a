//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Sensor timestamps are seconds (f64) on the capture clock shared by camera and gyro
//! - A decreasing timestamp within one stream is treated as a clock jump, never reordered

mod blueprint;
mod camera;
mod error;
mod inertial;
mod kernel;
mod output;
mod sink;
mod source;

pub use blueprint::*;
pub use camera::*;
pub use error::*;
pub use inertial::*;
pub use kernel::*;
pub use output::*;
pub use sink::*;
pub use source::{InboundCallback, InboundEvent, InboundSource, SourceKind};
