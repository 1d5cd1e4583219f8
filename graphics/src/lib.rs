//! # Larkspur Engine Graphics
//!
//! Geometry buffer and mesh resources for Larkspur Engine.
//!
//! ## Core Types
//!
//! - [`GraphicsDevice`] — Creates and tracks buffer resources
//! - [`resources::Buffer`] — Reference-counted buffer with CPU-backed storage
//! - [`mesh::Mesh`] — Incrementally editable geometry with derived render styles
//! - [`mesh::GeometryData`] — Staged stream edits pending commit
//!
//! The buffer layer is CPU-backed (the dummy-backend approach): identity,
//! capacity reuse, and readback behave like a hardware backend without
//! requiring one.

pub mod device;
pub mod error;
pub mod mesh;
pub mod resources;
pub mod types;

pub use device::GraphicsDevice;
pub use error::GraphicsError;
