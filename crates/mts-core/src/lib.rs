#![doc = "Core parameter types and errors shared by the memory tiering sweep crates."]

pub mod errors;
pub mod params;
pub mod schema;

pub use errors::{ErrorInfo, SweepError};
pub use params::{fields, ParamValue, PolicyField, PolicyType};
