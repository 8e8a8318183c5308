use crate::device::GpuContext;
use crate::error::{Error, Result};

/// Host-readable copy target for device buffers.
///
/// `COPY_DST | MAP_READ`; the contents are only accessible through
/// [`StagingBuffer::read`], which maps, copies out and unmaps.
pub struct StagingBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

impl StagingBuffer {
    pub fn new(device: &wgpu::Device, label: &str, size: u64) -> Result<Self> {
        check_copy_size(label, size)?;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Ok(Self { buffer, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Records a copy of `self.size()` bytes of `source`, starting at `offset`.
    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, source: &wgpu::Buffer, offset: u64) -> Result<()> {
        if offset.checked_add(self.size).is_none_or(|end| end > source.size()) {
            return Err(Error::out_of_bounds("staging copy source", offset, self.size, source.size()));
        }
        encoder.copy_buffer_to_buffer(source, offset, &self.buffer, 0, self.size);
        Ok(())
    }

    /// Maps for read, waits for the device, copies the bytes out and unmaps.
    ///
    /// Every submission writing into the buffer must already be submitted.
    pub fn read(&self, device: &wgpu::Device) -> Result<Vec<u8>> {
        let slice = self.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| Error::AsyncOp(format!("device poll failed: {e}")))?;

        rx.recv()
            .map_err(|_| Error::AsyncOp("map callback was dropped".into()))?
            .map_err(|e| Error::AsyncOp(format!("map for read rejected: {e}")))?;

        let bytes = slice.get_mapped_range().to_vec();
        self.buffer.unmap();
        Ok(bytes)
    }
}

/// Uploads `bytes` into a fresh storage buffer and reads them back through a
/// staging buffer.
pub fn round_trip(ctx: GpuContext<'_>, bytes: &[u8]) -> Result<Vec<u8>> {
    let size = bytes.len() as u64;
    check_copy_size("round trip", size)?;

    let storage = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("primer round trip"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    ctx.queue.write_buffer(&storage, 0, bytes);

    let staging = StagingBuffer::new(ctx.device, "primer round trip staging", size)?;
    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("primer round trip"),
    });
    staging.copy_from(&mut encoder, &storage, 0)?;
    ctx.queue.submit(std::iter::once(encoder.finish()));

    staging.read(ctx.device)
}

pub(crate) fn check_copy_size(label: &str, size: u64) -> Result<()> {
    if size == 0 || size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
        return Err(Error::mismatch(format!(
            "`{label}`: copy size {size} must be a non-zero multiple of {}",
            wgpu::COPY_BUFFER_ALIGNMENT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_sizes_must_be_aligned() {
        assert!(check_copy_size("x", 16).is_ok());
        assert!(check_copy_size("x", 0).is_err());
        assert!(check_copy_size("x", 6).is_err());
    }
}
