//! Device-backed checks. Each test skips when no adapter is available.

use primer_engine::compute::{round_trip, ComputeJob, StagingBuffer, WorkgroupGrid};
use primer_engine::device::{GpuInit, Headless};
use primer_engine::frame::{ColorTarget, FrameDriver, FrameState, Scene};
use primer_engine::layout::{VertexAttribute, VertexLayout};
use primer_engine::resources::{
    BindGroupId, BindingRef, BufferId, ImageSource, PipelineDesc, PipelineId, PipelineTarget, ResourceInitializer,
    SamplerDesc, SceneDesc, StageRef, TextureId, TextureSource, TransformBlock,
};
use primer_engine::{Error, Result};

fn headless() -> Option<Headless> {
    match Headless::acquire(GpuInit::default()) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

const DOUBLE: &str = r#"
@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;

@compute @workgroup_size(4)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x < arrayLength(&input)) {
        output[id.x] = input[id.x] * 2.0;
    }
}
"#;

const TEXTURED: &str = r#"
struct Transforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    world: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> transforms: Transforms;
@group(0) @binding(1) var color_texture: texture_2d<f32>;
@group(0) @binding(2) var color_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec4<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = transforms.projection * transforms.view * transforms.world * position;
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(color_texture, color_sampler, input.uv);
}
"#;

const FULLSCREEN_TRIANGLE: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(i) - 1);
    let y = f32(i32(i & 1u) * 2 - 1);
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

// ── readback ──

#[test]
fn staging_round_trip_is_byte_identical() {
    let Some(gpu) = headless() else { return };
    let bytes: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
    assert_eq!(round_trip(gpu.context(), &bytes).unwrap(), bytes);
}

#[test]
fn staging_copy_past_end_is_out_of_bounds() {
    let Some(gpu) = headless() else { return };
    let device = gpu.device();
    let source = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("source"),
        size: 64,
        usage: wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let staging = StagingBuffer::new(device, "staging", 16).unwrap();
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

    staging.copy_from(&mut encoder, &source, 48).unwrap();
    assert!(matches!(
        staging.copy_from(&mut encoder, &source, 52),
        Err(Error::OutOfBounds { offset: 52, end: 68, size: 64, .. })
    ));
    assert!(matches!(
        staging.copy_from(&mut encoder, &source, u64::MAX),
        Err(Error::OutOfBounds { end: u64::MAX, .. })
    ));
}

// ── compute ──

#[test]
fn compute_doubles_input() {
    let Some(gpu) = headless() else { return };
    let job = ComputeJob::new(gpu.context(), "double", DOUBLE, "main").unwrap();
    assert_eq!(job.workgroup_size(), [4, 1, 1]);
    assert_eq!(job.run_f32(gpu.context(), &[1.0, 2.0, 3.0, 4.0]).unwrap(), vec![2.0, 4.0, 6.0, 8.0]);
}

#[test]
fn compute_covers_ragged_extents() {
    let Some(gpu) = headless() else { return };
    let job = ComputeJob::new(gpu.context(), "double", DOUBLE, "main").unwrap();
    let input: Vec<f32> = (0..37).map(|i| i as f32).collect();
    let output = job.run_f32(gpu.context(), &input).unwrap();
    assert!(output.iter().zip(&input).all(|(o, i)| *o == i * 2.0));
}

#[test]
fn undersized_grid_is_refused_before_dispatch() {
    let Some(gpu) = headless() else { return };
    let job = ComputeJob::new(gpu.context(), "double", DOUBLE, "main").unwrap();
    let input = [0u8; 64];
    let err = job
        .run_with_grid(gpu.context(), &input, [16, 1, 1], WorkgroupGrid::new(3, 1, 1))
        .unwrap_err();
    assert!(matches!(err, Error::BoundaryCoverage { .. }));
}

#[test]
fn extent_short_of_the_input_is_refused() {
    let Some(gpu) = headless() else { return };
    let job = ComputeJob::new(gpu.context(), "double", DOUBLE, "main").unwrap();
    let input = [1.0f32; 100];
    let err = job.run(gpu.context(), bytemuck::cast_slice(&input), [4, 1, 1]).unwrap_err();
    assert!(matches!(err, Error::ConfigurationMismatch(_)));

    let doubled = job.run(gpu.context(), bytemuck::cast_slice(&input), [100, 1, 1]).unwrap();
    assert_eq!(doubled.len(), 400);
    assert!(doubled.chunks_exact(4).all(|c| bytemuck::pod_read_unaligned::<f32>(c) == 2.0));
}

#[test]
fn compute_binding_convention_is_checked() {
    let Some(gpu) = headless() else { return };
    let src = "@compute @workgroup_size(1) fn main() {}";
    assert!(matches!(
        ComputeJob::new(gpu.context(), "empty", src, "main"),
        Err(Error::ConfigurationMismatch(_))
    ));
}

// ── resources ──

struct Textured {
    desc: SceneDesc,
    vertices: BufferId,
    texture: TextureId,
}

fn textured_scene() -> Textured {
    let mut desc = SceneDesc::new("textured").with_depth();
    let shader = desc.shader("textured", TEXTURED);
    let layout = VertexLayout::per_vertex(
        24,
        &[
            VertexAttribute::new(0, 0, wgpu::VertexFormat::Float32x4),
            VertexAttribute::new(1, 16, wgpu::VertexFormat::Float32x2),
        ],
    )
    .unwrap();
    let pipeline = desc.pipeline(
        PipelineDesc::new("textured", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
            .with_vertex_buffer(layout.clone()),
    );
    let vertices = desc.vertex_buffer("triangle", layout, &[0.0f32; 18]);
    let uniform = desc.uniform_buffer("transforms", TransformBlock::SIZE);
    let texture = desc.texture("checker", TextureSource::Image(ImageSource::checkerboard(4, 8)));
    let sampler = desc.sampler(SamplerDesc::linear("linear"));
    desc.bind_group(
        "textured",
        pipeline,
        0,
        &[
            (0, BindingRef::Buffer(uniform)),
            (1, BindingRef::Texture(texture)),
            (2, BindingRef::Sampler(sampler)),
        ],
    );
    Textured {
        desc,
        vertices,
        texture,
    }
}

#[test]
fn textured_scene_initializes() {
    let Some(gpu) = headless() else { return };
    let scene = textured_scene();
    let resources = ResourceInitializer::new(gpu.context()).initialize(&scene.desc).unwrap();
    assert_eq!(resources.texture(scene.texture).unwrap().size(), (32, 32));
    assert!(resources.attachments().depth().is_some());
    assert!(resources.attachments().msaa().is_none());
}

#[test]
fn identical_descriptions_yield_independent_resources() {
    let Some(gpu) = headless() else { return };
    let init = ResourceInitializer::new(gpu.context());
    let scene = textured_scene();
    let a = init.initialize(&scene.desc).unwrap();
    let b = init.initialize(&textured_scene().desc).unwrap();
    assert_eq!(a.manifest(), b.manifest());

    drop(a);
    assert_eq!(b.buffer(scene.vertices).unwrap().size(), 72);
}

#[test]
fn missing_binding_fails_before_allocation() {
    let Some(gpu) = headless() else { return };
    let mut desc = textured_scene().desc;
    desc.bind_groups[0].entries.pop();
    let err = ResourceInitializer::new(gpu.context()).initialize(&desc).unwrap_err();
    assert!(matches!(err, Error::ConfigurationMismatch(_)));
}

#[test]
fn undecodable_texture_is_reported() {
    let Some(gpu) = headless() else { return };
    let mut desc = textured_scene().desc;
    desc.textures[0].source = TextureSource::Image(ImageSource::Encoded(vec![0u8, 1, 2].into()));
    let err = ResourceInitializer::new(gpu.context()).initialize(&desc).unwrap_err();
    assert!(matches!(err, Error::ImageDecode(_)));
}

// ── offscreen frames ──

struct Offscreen;

struct OffscreenHandles {
    pipeline: PipelineId,
    target: TextureId,
}

impl Scene for Offscreen {
    type Handles = OffscreenHandles;

    fn describe(&self) -> Result<(SceneDesc, OffscreenHandles)> {
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut desc = SceneDesc::new("offscreen");
        let shader = desc.shader("triangle", FULLSCREEN_TRIANGLE);
        let pipeline = desc.pipeline(
            PipelineDesc::new("triangle", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_target(PipelineTarget::Offscreen(format)),
        );
        let target = desc.texture(
            "target",
            TextureSource::RenderTarget {
                width: 64,
                height: 64,
                format,
            },
        );
        Ok((desc, OffscreenHandles { pipeline, target }))
    }

    fn record(&mut self, h: &OffscreenHandles, frame: &mut FrameState<'_>) -> Result<()> {
        let mut pass = frame.begin_pass(ColorTarget::Texture(h.target))?;
        pass.set_pipeline(h.pipeline)?;
        pass.draw(0..3, 0..1)
    }
}

#[test]
fn offscreen_tick_encodes_and_submits() {
    let Some(gpu) = headless() else { return };
    let mut driver = FrameDriver::new(gpu.context(), Offscreen).unwrap();
    for i in 0..3 {
        let stats = driver
            .render_offscreen(gpu.context(), primer_engine::time::FrameTime::at(i as f32, i))
            .unwrap();
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.submissions, 1);
    }
}

const TINTED_TRIANGLE: &str = r#"
@group(0) @binding(0) var<uniform> tint: vec4<f32>;

@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(i) - 1);
    let y = f32(i32(i & 1u) * 2 - 1);
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return tint;
}
"#;

/// Offscreen triangle whose fragment stage reads a uniform at `@group(0)`.
struct Tinted {
    bind: bool,
}

struct TintedHandles {
    pipeline: PipelineId,
    target: TextureId,
    group: BindGroupId,
}

impl Scene for Tinted {
    type Handles = TintedHandles;

    fn describe(&self) -> Result<(SceneDesc, TintedHandles)> {
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut desc = SceneDesc::new("tinted");
        let shader = desc.shader("tinted", TINTED_TRIANGLE);
        let pipeline = desc.pipeline(
            PipelineDesc::new("tinted", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_target(PipelineTarget::Offscreen(format)),
        );
        let target = desc.texture(
            "target",
            TextureSource::RenderTarget {
                width: 16,
                height: 16,
                format,
            },
        );
        let tint = desc.uniform_buffer("tint", 16);
        let group = desc.bind_group("tint", pipeline, 0, &[(0, BindingRef::Buffer(tint))]);
        Ok((desc, TintedHandles { pipeline, target, group }))
    }

    fn record(&mut self, h: &TintedHandles, frame: &mut FrameState<'_>) -> Result<()> {
        let mut pass = frame.begin_pass(ColorTarget::Texture(h.target))?;
        pass.set_pipeline(h.pipeline)?;
        if self.bind {
            pass.set_bind_group(0, h.group)?;
        }
        pass.draw(0..3, 0..1)
    }
}

#[test]
fn unbound_group_fails_the_tick_instead_of_the_device() {
    let Some(gpu) = headless() else { return };
    let time = primer_engine::time::FrameTime::at(0.0, 0);

    let mut unbound = FrameDriver::new(gpu.context(), Tinted { bind: false }).unwrap();
    let err = unbound.render_offscreen(gpu.context(), time).unwrap_err();
    assert!(matches!(err, Error::ConfigurationMismatch(_)));

    let mut bound = FrameDriver::new(gpu.context(), Tinted { bind: true }).unwrap();
    assert_eq!(bound.render_offscreen(gpu.context(), time).unwrap().draws, 1);
}
