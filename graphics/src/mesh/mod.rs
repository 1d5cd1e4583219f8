//! Mesh types for the graphics engine.
//!
//! This module provides the incremental geometry system:
//!
//! - [`GeometryData`] - Staged vertex/index stream edits pending commit
//! - [`Mesh`] - GPU mesh with per-render-style index buffers and primitives
//! - [`VertexLayout`] - Interleaved layout synthesized from staged streams
//! - [`Morph`] / [`Skin`] - Counted resource associations
//!
//! Edits staged through [`Mesh`]'s typed setters accumulate in a
//! [`GeometryData`] and are committed by [`Mesh::update`], which prefers
//! in-place buffer reuse and only reallocates when capacity is exceeded.

mod data;
mod geometry;
mod layout;
mod morph;

pub use data::{
    IndexFormat, Mesh, MeshId, Primitive, PrimitiveTopology, RenderStyle, StreamDest,
};
pub use geometry::{GeometryData, StreamData, VertexStream};
pub use layout::{VertexAttribute, VertexElementFormat, VertexLayout, VertexSemantic};
pub use morph::{Morph, Skin};
