pub mod bundler;
pub mod error;
pub mod instances;
pub mod package;
pub mod scaffold;
pub mod template;
pub mod validate;
pub mod verify;

/// Returns the crate version baked in at compile time.
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
