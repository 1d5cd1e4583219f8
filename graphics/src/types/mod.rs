//! Descriptor and flag types for graphics resources.

mod buffer;

pub use buffer::{BufferDescriptor, BufferUsage, BufferUsageHint};
