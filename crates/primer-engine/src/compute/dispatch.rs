use crate::error::{Error, Result};

/// Number of workgroups dispatched along each axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WorkgroupGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupGrid {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Smallest grid covering `extent` with workgroups of `workgroup_size`:
    /// `ceil(extent / size)` per axis.
    ///
    /// A zero workgroup dimension is treated as 1.
    pub fn covering(extent: [u32; 3], workgroup_size: [u32; 3]) -> Self {
        let axis = |i: usize| extent[i].div_ceil(workgroup_size[i].max(1));
        Self::new(axis(0), axis(1), axis(2))
    }

    pub const fn as_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }

    /// Total invocations along each axis.
    pub fn invocations(self, workgroup_size: [u32; 3]) -> [u64; 3] {
        let g = self.as_array();
        [0, 1, 2].map(|i| g[i] as u64 * workgroup_size[i] as u64)
    }

    /// Fails with [`Error::BoundaryCoverage`] when any axis under-covers `extent`.
    ///
    /// An undersized grid silently skips the trailing elements, so this is checked
    /// before every dispatch.
    pub fn verify_covers(self, extent: [u32; 3], workgroup_size: [u32; 3]) -> Result<()> {
        let invocations = self.invocations(workgroup_size);
        if (0..3).any(|i| invocations[i] < extent[i] as u64) {
            return Err(Error::BoundaryCoverage {
                grid: self.as_array(),
                extent,
                workgroup_size,
                required: Self::covering(extent, workgroup_size).as_array(),
            });
        }
        Ok(())
    }
}

impl From<[u32; 3]> for WorkgroupGrid {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self::new(x, y, z)
    }
}
