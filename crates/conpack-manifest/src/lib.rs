pub mod manifest;

pub use manifest::{InstanceSpec, InstancesFile, Manifest};
