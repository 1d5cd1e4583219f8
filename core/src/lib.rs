//! # Larkspur Engine Core
//!
//! Core crate for Larkspur Engine basic utilities: math type aliases,
//! bounding volumes, and optional profiling instrumentation.

pub mod aabb;
pub mod math;
pub mod profiling;

pub use aabb::Aabb;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the engine core version at startup.
pub fn init() {
    log::info!("Larkspur Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
