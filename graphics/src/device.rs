//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::BufferDescriptor;

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum buffer size.
    pub max_buffer_size: u64,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_buffer_size: 1 << 30, // 1 GB
        }
    }
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across threads.
/// All resource creation methods use interior mutability where needed.
///
/// # Example
///
/// ```
/// use larkspur_graphics::device::GraphicsDevice;
/// use larkspur_graphics::types::{BufferDescriptor, BufferUsage};
///
/// let device = GraphicsDevice::new("test device");
/// let buffer = device
///     .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
///     .unwrap();
/// assert_eq!(buffer.size(), 1024);
/// ```
pub struct GraphicsDevice {
    name: String,
    capabilities: DeviceCapabilities,
    // Track allocated resources (weak references for cleanup/debugging)
    buffers: RwLock<Vec<Weak<Buffer>>>,
}

impl GraphicsDevice {
    /// Create a new graphics device.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            capabilities: DeviceCapabilities::default(),
            buffers: RwLock::new(Vec::new()),
        })
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size is zero or exceeds device limits.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        // Validate
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        // Create the buffer
        let buffer = Arc::new(Buffer::new(Arc::downgrade(self), descriptor.clone()));

        // Track it
        self.buffers.write().push(Arc::downgrade(&buffer));

        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Number of currently alive buffers created by this device.
    ///
    /// Also drops dead weak entries from the tracking list.
    pub fn alive_buffer_count(&self) -> usize {
        let mut buffers = self.buffers.write();
        buffers.retain(|w| w.strong_count() > 0);
        buffers.len()
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BufferUsage;

    #[test]
    fn create_buffer_validates_size() {
        let device = GraphicsDevice::new("test");
        let err = device
            .create_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
    }

    #[test]
    fn tracks_alive_buffers() {
        let device = GraphicsDevice::new("test");
        let a = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::VERTEX))
            .unwrap();
        let b = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::INDEX))
            .unwrap();
        assert_eq!(device.alive_buffer_count(), 2);
        drop(a);
        assert_eq!(device.alive_buffer_count(), 1);
        drop(b);
        assert_eq!(device.alive_buffer_count(), 0);
    }
}
