use crate::error::{Error, Result};

/// Runs `work` inside a validation error scope.
///
/// A validation error the device raises while `work` runs comes back as
/// [`Error::ConfigurationMismatch`] instead of reaching the uncaptured-error
/// handler, which panics by default. An error returned by `work` itself wins.
pub(crate) fn validated<T>(device: &wgpu::Device, what: &str, work: impl FnOnce() -> Result<T>) -> Result<T> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = work();
    let captured = pollster::block_on(scope.pop());

    let value = result?;
    match captured {
        Some(err) => {
            log::error!("{what} rejected by the device: {err}");
            Err(Error::mismatch(format!("{what} rejected by the device: {err}")))
        }
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GpuInit, Headless};

    #[test]
    fn device_validation_error_becomes_a_mismatch() {
        let Ok(gpu) = Headless::acquire(GpuInit::default()) else { return };
        let device = gpu.device();

        let err = validated(device, "buffer", || {
            // MAP_READ only combines with COPY_DST without extra features.
            Ok(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("invalid usage"),
                size: 16,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            }))
        })
        .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMismatch(_)));

        let ok = validated(device, "buffer", || {
            Ok(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback"),
                size: 16,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }))
        });
        assert!(ok.is_ok());
    }

    #[test]
    fn work_error_takes_precedence() {
        let Ok(gpu) = Headless::acquire(GpuInit::default()) else { return };
        let err = validated::<()>(gpu.device(), "nothing", || Err(Error::mismatch("early"))).unwrap_err();
        assert!(matches!(err, Error::ConfigurationMismatch(m) if m == "early"));
    }
}
