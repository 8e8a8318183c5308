//! WGSL interface reflection.
//!
//! Pipelines are created with an automatic layout, so wgpu would only notice a
//! binding or vertex-input disagreement deep inside pipeline or bind group creation.
//! Reflection lets the initializer check both up front and report a
//! [`ConfigurationMismatch`](crate::Error::ConfigurationMismatch) naming the offending slot.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Resource type expected at a binding slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    Texture,
    StorageTexture,
    Sampler,
}

/// One `@group(g) @binding(b)` declaration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReflectedBinding {
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
    /// Smallest buffer the slot accepts; a runtime-sized array counts as one element.
    pub min_size: Option<u64>,
    pub name: Option<String>,
}

/// Parsed interface of one WGSL module.
#[derive(Debug)]
pub struct ShaderReflection {
    label: String,
    module: naga::Module,
}

impl ShaderReflection {
    pub fn parse(label: impl Into<String>, source: &str) -> Result<Self> {
        let label = label.into();
        let module = naga::front::wgsl::parse_str(source).map_err(|e| Error::ShaderParse {
            message: e.emit_to_string(source),
            label: label.clone(),
        })?;
        Ok(Self { label, module })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn entry_point(&self, name: &str, stage: naga::ShaderStage) -> Result<&naga::EntryPoint> {
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.name == name && ep.stage == stage)
            .ok_or_else(|| {
                Error::mismatch(format!(
                    "shader `{}` has no {stage:?} entry point named `{name}`",
                    self.label
                ))
            })
    }

    /// Ensures a fragment entry point exists.
    pub fn require_fragment(&self, name: &str) -> Result<()> {
        self.entry_point(name, naga::ShaderStage::Fragment).map(|_| ())
    }

    /// `@location` indices consumed by a vertex entry point.
    ///
    /// Inputs may be plain arguments or members of a struct argument; builtins
    /// such as `@builtin(vertex_index)` are skipped.
    pub fn vertex_inputs(&self, entry: &str) -> Result<BTreeSet<u32>> {
        let ep = self.entry_point(entry, naga::ShaderStage::Vertex)?;
        let mut locations = BTreeSet::new();

        for arg in &ep.function.arguments {
            match &arg.binding {
                Some(naga::Binding::Location { location, .. }) => {
                    locations.insert(*location);
                }
                Some(naga::Binding::BuiltIn(_)) => {}
                None => {
                    if let naga::TypeInner::Struct { members, .. } = &self.module.types[arg.ty].inner {
                        for member in members {
                            if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                                locations.insert(*location);
                            }
                        }
                    }
                }
            }
        }

        Ok(locations)
    }

    /// `@workgroup_size` of a compute entry point.
    pub fn workgroup_size(&self, entry: &str) -> Result<[u32; 3]> {
        let ep = self.entry_point(entry, naga::ShaderStage::Compute)?;
        Ok(ep.workgroup_size)
    }

    /// Every `@group` index the module declares a binding in, ascending.
    pub fn groups(&self) -> BTreeSet<u32> {
        self.module
            .global_variables
            .iter()
            .filter_map(|(_, var)| var.binding.as_ref().map(|rb| rb.group))
            .collect()
    }

    /// All bindings declared in `group`, ordered by binding number.
    pub fn bindings(&self, group: u32) -> Vec<ReflectedBinding> {
        let ctx = self.module.to_ctx();
        let mut out: Vec<ReflectedBinding> = self
            .module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let rb = var.binding.as_ref()?;
                if rb.group != group {
                    return None;
                }
                let inner = &self.module.types[var.ty].inner;
                let kind = match var.space {
                    naga::AddressSpace::Uniform => BindingKind::UniformBuffer,
                    naga::AddressSpace::Storage { access } => BindingKind::StorageBuffer {
                        read_only: !access.contains(naga::StorageAccess::STORE),
                    },
                    naga::AddressSpace::Handle => match inner {
                        naga::TypeInner::Sampler { .. } => BindingKind::Sampler,
                        naga::TypeInner::Image { class: naga::ImageClass::Storage { .. }, .. } => {
                            BindingKind::StorageTexture
                        }
                        naga::TypeInner::Image { .. } => BindingKind::Texture,
                        _ => return None,
                    },
                    _ => return None,
                };
                let min_size = match kind {
                    BindingKind::UniformBuffer | BindingKind::StorageBuffer { .. } => {
                        Some(u64::from(inner.size(ctx)))
                    }
                    _ => None,
                };
                Some(ReflectedBinding {
                    group: rb.group,
                    binding: rb.binding,
                    kind,
                    min_size,
                    name: var.name.clone(),
                })
            })
            .collect();

        out.sort_by_key(|b| b.binding);
        out
    }
}

/// Union of the bindings two stages declare for one group.
///
/// Vertex and fragment stages may live in different modules; a slot declared by
/// both must agree on its kind.
pub fn merged_bindings(stages: &[&ShaderReflection], group: u32) -> Result<Vec<ReflectedBinding>> {
    let mut merged: Vec<ReflectedBinding> = Vec::new();

    for stage in stages {
        for binding in stage.bindings(group) {
            match merged.iter_mut().find(|b| b.binding == binding.binding) {
                Some(existing) if existing.kind != binding.kind => {
                    return Err(Error::mismatch(format!(
                        "@group({group}) @binding({}) is {:?} in one stage and {:?} in `{}`",
                        binding.binding,
                        existing.kind,
                        binding.kind,
                        stage.label(),
                    )));
                }
                Some(existing) => {
                    existing.min_size = existing.min_size.max(binding.min_size);
                }
                None => merged.push(binding),
            }
        }
    }

    merged.sort_by_key(|b| b.binding);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTURED: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    world: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(0) @binding(1) var color_texture: texture_2d<f32>;
@group(0) @binding(2) var color_sampler: sampler;
@group(0) @binding(3) var<storage, read> worlds: array<mat4x4<f32>>;

struct VertexInput {
    @location(0) position: vec4<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput, @builtin(instance_index) instance: u32) -> VertexOutput {
    var out: VertexOutput;
    out.position = uniforms.projection * uniforms.view * worlds[instance] * input.position;
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(color_texture, color_sampler, input.uv);
}
"#;

    const COMPUTE: &str = r#"
@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    output[id.x] = input[id.x] * 2.0;
}
"#;

    // ── vertex inputs ─────────────────────────────────────────────────────

    #[test]
    fn struct_vertex_inputs_are_collected() {
        let r = ShaderReflection::parse("textured", TEXTURED).unwrap();
        let inputs = r.vertex_inputs("vs_main").unwrap();
        assert_eq!(inputs.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn argument_locations_are_collected() {
        let src = r#"
@vertex
fn main(@location(0) position: vec4<f32>, @location(2) offset: vec2<f32>) -> @builtin(position) vec4<f32> {
    return position + vec4<f32>(offset, 0.0, 0.0);
}
"#;
        let r = ShaderReflection::parse("args", src).unwrap();
        let inputs = r.vertex_inputs("main").unwrap();
        assert_eq!(inputs.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn missing_entry_point_is_a_mismatch() {
        let r = ShaderReflection::parse("textured", TEXTURED).unwrap();
        assert!(matches!(r.vertex_inputs("main"), Err(Error::ConfigurationMismatch(_))));
        assert!(r.require_fragment("fs_main").is_ok());
        assert!(r.require_fragment("vs_main").is_err());
    }

    // ── bindings ──────────────────────────────────────────────────────────

    #[test]
    fn bindings_report_kind_and_uniform_size() {
        let r = ShaderReflection::parse("textured", TEXTURED).unwrap();
        let b = r.bindings(0);
        assert_eq!(b.len(), 4);
        assert_eq!(b[0].kind, BindingKind::UniformBuffer);
        assert_eq!(b[0].min_size, Some(192));
        assert_eq!(b[1].kind, BindingKind::Texture);
        assert_eq!(b[2].kind, BindingKind::Sampler);
        assert_eq!(b[3].kind, BindingKind::StorageBuffer { read_only: true });
        assert_eq!(b[3].min_size, Some(64));
        assert!(r.bindings(1).is_empty());
        assert_eq!(r.groups().into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn merging_rejects_conflicting_kinds() {
        let a = ShaderReflection::parse("a", "@group(0) @binding(0) var<uniform> u: vec4<f32>;").unwrap();
        let b = ShaderReflection::parse("b", "@group(0) @binding(0) var s: sampler;").unwrap();
        assert!(merged_bindings(&[&a, &b], 0).is_err());
        assert_eq!(merged_bindings(&[&a, &a], 0).unwrap().len(), 1);
    }

    // ── compute ───────────────────────────────────────────────────────────

    #[test]
    fn workgroup_size_is_read_from_the_shader() {
        let r = ShaderReflection::parse("compute", COMPUTE).unwrap();
        assert_eq!(r.workgroup_size("main").unwrap(), [8, 8, 1]);
        let b = r.bindings(0);
        assert_eq!(b[1].kind, BindingKind::StorageBuffer { read_only: false });
    }

    #[test]
    fn parse_error_names_the_shader() {
        let err = ShaderReflection::parse("broken", "fn (").unwrap_err();
        assert!(matches!(err, Error::ShaderParse { ref label, .. } if label == "broken"));
    }
}
