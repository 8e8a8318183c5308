use crate::error::{Error, Result};

/// How often the attribute stream advances.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StepMode {
    /// One value per vertex.
    Vertex,
    /// One value per instance.
    Instance,
}

impl From<StepMode> for wgpu::VertexStepMode {
    fn from(mode: StepMode) -> Self {
        match mode {
            StepMode::Vertex => wgpu::VertexStepMode::Vertex,
            StepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

/// One attribute inside a vertex buffer element.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    /// `@location(n)` the attribute feeds in the vertex shader.
    pub location: u32,
    /// Byte offset from the start of the element.
    pub offset: u64,
    pub format: wgpu::VertexFormat,
}

impl VertexAttribute {
    pub const fn new(location: u32, offset: u64, format: wgpu::VertexFormat) -> Self {
        Self { location, offset, format }
    }

    /// First byte past the attribute.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.format.size()
    }
}

/// Validated layout of one vertex buffer.
///
/// Invariants (checked by the constructors):
/// - `stride > 0`
/// - every attribute satisfies `offset + format.size() <= stride`
/// - shader locations are unique within the layout
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    stride: u64,
    step_mode: StepMode,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    /// Layout advancing once per vertex.
    pub fn per_vertex(stride: u64, attributes: &[VertexAttribute]) -> Result<Self> {
        Self::new(stride, StepMode::Vertex, attributes)
    }

    /// Layout advancing once per instance.
    pub fn per_instance(stride: u64, attributes: &[VertexAttribute]) -> Result<Self> {
        Self::new(stride, StepMode::Instance, attributes)
    }

    pub fn new(stride: u64, step_mode: StepMode, attributes: &[VertexAttribute]) -> Result<Self> {
        if stride == 0 {
            return Err(Error::InvalidLayout("stride must be non-zero".into()));
        }
        if attributes.is_empty() {
            return Err(Error::InvalidLayout("layout declares no attributes".into()));
        }

        for (i, attr) in attributes.iter().enumerate() {
            if attr.end() > stride {
                return Err(Error::InvalidLayout(format!(
                    "attribute @location({}) spans bytes {}..{} but stride is {stride}",
                    attr.location,
                    attr.offset,
                    attr.end(),
                )));
            }
            if attributes[..i].iter().any(|a| a.location == attr.location) {
                return Err(Error::InvalidLayout(format!(
                    "location {} declared more than once",
                    attr.location
                )));
            }
        }

        let attributes = attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format,
                offset: a.offset,
                shader_location: a.location,
            })
            .collect();

        Ok(Self { stride, step_mode, attributes })
    }

    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    #[inline]
    pub fn step_mode(&self) -> StepMode {
        self.step_mode
    }

    /// Shader locations fed by this layout, in declaration order.
    pub fn locations(&self) -> impl Iterator<Item = u32> + '_ {
        self.attributes.iter().map(|a| a.shader_location)
    }

    /// Number of whole elements in `byte_len` bytes of data laid out with this stride.
    ///
    /// Fails when the data is not a whole number of elements.
    pub fn element_count(&self, byte_len: u64) -> Result<u32> {
        instance_count(byte_len, self.stride)
    }

    /// Borrowed wgpu view used at pipeline creation.
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode.into(),
            attributes: &self.attributes,
        }
    }
}

/// `data_len / element_width`, refusing partial elements.
///
/// Units only need to agree: bytes and a byte stride, or floats and a float width.
pub fn instance_count(data_len: u64, element_width: u64) -> Result<u32> {
    if element_width == 0 {
        return Err(Error::mismatch("element width must be non-zero"));
    }
    if data_len % element_width != 0 {
        return Err(Error::mismatch(format!(
            "data length {data_len} is not a multiple of element width {element_width}"
        )));
    }
    u32::try_from(data_len / element_width)
        .map_err(|_| Error::mismatch(format!("element count {} exceeds u32", data_len / element_width)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::VertexFormat::{Float32x2, Float32x4};

    fn quad_attrs() -> [VertexAttribute; 2] {
        [
            VertexAttribute::new(0, 0, Float32x4),
            VertexAttribute::new(1, 16, Float32x4),
        ]
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn position_color_fits_32_byte_stride() {
        let layout = VertexLayout::per_vertex(32, &quad_attrs()).unwrap();
        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.locations().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(layout.step_mode(), StepMode::Vertex);
    }

    #[test]
    fn attribute_overrunning_stride_is_rejected() {
        let err = VertexLayout::per_vertex(28, &quad_attrs()).unwrap_err();
        assert!(matches!(err, Error::InvalidLayout(_)));
    }

    #[test]
    fn attribute_ending_exactly_at_stride_is_accepted() {
        let attrs = [
            VertexAttribute::new(0, 0, Float32x4),
            VertexAttribute::new(1, 16, Float32x4),
            VertexAttribute::new(2, 32, Float32x2),
        ];
        assert!(VertexLayout::per_vertex(40, &attrs).is_ok());
    }

    #[test]
    fn zero_stride_is_rejected() {
        assert!(matches!(
            VertexLayout::per_vertex(0, &quad_attrs()),
            Err(Error::InvalidLayout(_))
        ));
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let attrs = [
            VertexAttribute::new(0, 0, Float32x4),
            VertexAttribute::new(0, 16, Float32x4),
        ];
        assert!(VertexLayout::per_vertex(32, &attrs).is_err());
    }

    #[test]
    fn empty_layout_is_rejected() {
        assert!(VertexLayout::per_vertex(16, &[]).is_err());
    }

    #[test]
    fn wgpu_view_carries_stride_and_step_mode() {
        let layout =
            VertexLayout::per_instance(8, &[VertexAttribute::new(2, 0, Float32x2)]).unwrap();
        let raw = layout.as_wgpu();
        assert_eq!(raw.array_stride, 8);
        assert_eq!(raw.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(raw.attributes[0].shader_location, 2);
    }

    // ── element counts ────────────────────────────────────────────────────

    #[test]
    fn eighteen_floats_at_width_two_is_nine_instances() {
        assert_eq!(instance_count(18, 2).unwrap(), 9);

        let layout =
            VertexLayout::per_instance(8, &[VertexAttribute::new(2, 0, Float32x2)]).unwrap();
        assert_eq!(layout.element_count(18 * 4).unwrap(), 9);
    }

    #[test]
    fn partial_element_is_a_mismatch() {
        assert!(matches!(instance_count(17, 2), Err(Error::ConfigurationMismatch(_))));
    }

    #[test]
    fn zero_width_is_a_mismatch() {
        assert!(instance_count(8, 0).is_err());
    }
}
