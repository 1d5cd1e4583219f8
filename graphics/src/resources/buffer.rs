//! GPU buffer resource.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::device::GraphicsDevice;
use crate::types::BufferDescriptor;

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and are
/// reference-counted. They hold a weak reference back to their parent device.
/// Storage is CPU-backed; [`Buffer::write`] and [`Buffer::read`] stand in for
/// the upload/readback paths a hardware backend would provide.
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// buffer.write(0, &[0u8; 16]);
/// ```
pub struct Buffer {
    device: Weak<GraphicsDevice>,
    descriptor: BufferDescriptor,
    contents: RwLock<Vec<u8>>,
}

impl Buffer {
    /// Create a new buffer (called by GraphicsDevice).
    pub(crate) fn new(device: Weak<GraphicsDevice>, descriptor: BufferDescriptor) -> Self {
        let contents = RwLock::new(vec![0u8; descriptor.size as usize]);
        Self {
            device,
            descriptor,
            contents,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<GraphicsDevice>> {
        self.device.upgrade()
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Write `data` into the buffer starting at `offset` bytes.
    ///
    /// Writes past the end of the buffer are truncated. A truncated write is
    /// a caller bug and asserts in debug builds.
    pub fn write(&self, offset: usize, data: &[u8]) {
        let mut contents = self.contents.write();
        let len = contents.len();
        debug_assert!(
            offset + data.len() <= len,
            "buffer write out of range: offset {} + len {} > size {}",
            offset,
            data.len(),
            len
        );
        if offset >= len {
            return;
        }
        let n = data.len().min(len - offset);
        contents[offset..offset + n].copy_from_slice(&data[..n]);
    }

    /// Read bytes starting at `offset` into `out`, returning the number of
    /// bytes copied. Reads past the end of the buffer are truncated.
    pub fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let contents = self.contents.read();
        let len = contents.len();
        if offset >= len {
            return 0;
        }
        let n = out.len().min(len - offset);
        out[..n].copy_from_slice(&contents[offset..offset + n]);
        n
    }

    /// Snapshot the full buffer contents.
    pub fn read_to_vec(&self) -> Vec<u8> {
        self.contents.read().clone()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BufferUsage;

    #[test]
    fn test_buffer_debug() {
        let desc = BufferDescriptor::new(1024, BufferUsage::VERTEX);
        let buffer = Buffer::new(Weak::new(), desc);
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
    }

    #[test]
    fn test_buffer_write_read() {
        let desc = BufferDescriptor::new(16, BufferUsage::VERTEX | BufferUsage::MAP_READ);
        let buffer = Buffer::new(Weak::new(), desc);
        buffer.write(4, &[1, 2, 3, 4]);

        let mut out = [0u8; 4];
        let n = buffer.read(4, &mut out);
        assert_eq!(n, 4);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_buffer_read_truncated() {
        let desc = BufferDescriptor::new(8, BufferUsage::VERTEX);
        let buffer = Buffer::new(Weak::new(), desc);
        let mut out = [0u8; 16];
        assert_eq!(buffer.read(0, &mut out), 8);
        assert_eq!(buffer.read(8, &mut out), 0);
    }
}
