//! Bind group entries checked against a pipeline's reflected layout.

use crate::error::{Error, Result};
use crate::reflect::{BindingKind, ReflectedBinding};

use super::desc::{BindGroupDesc, BindingRef, BufferDesc, BufferKind, SceneDesc};

/// Checks that `group` provides exactly the slots the shader declares, each with a
/// resource of the declared kind.
pub(crate) fn validate_bind_group(
    scene: &SceneDesc,
    group: &BindGroupDesc,
    reflected: &[ReflectedBinding],
) -> Result<()> {
    let label = &group.label;

    for (i, (binding, _)) in group.entries.iter().enumerate() {
        if group.entries[..i].iter().any(|(b, _)| b == binding) {
            return Err(Error::mismatch(format!("bind group `{label}` sets @binding({binding}) twice")));
        }
        if !reflected.iter().any(|r| r.binding == *binding) {
            return Err(Error::mismatch(format!(
                "bind group `{label}` sets @binding({binding}) which @group({}) does not declare",
                group.group
            )));
        }
    }

    for slot in reflected {
        let Some((_, resource)) = group.entries.iter().find(|(b, _)| *b == slot.binding) else {
            return Err(Error::mismatch(format!(
                "bind group `{label}` leaves @group({}) @binding({}){} unset",
                slot.group,
                slot.binding,
                slot.name.as_deref().map(|n| format!(" (`{n}`)")).unwrap_or_default(),
            )));
        };
        check_slot(scene, label, slot, *resource)?;
    }

    Ok(())
}

fn check_slot(scene: &SceneDesc, label: &str, slot: &ReflectedBinding, resource: BindingRef) -> Result<()> {
    let wrong = |found: &str| {
        Error::mismatch(format!(
            "bind group `{label}` @binding({}) expects {:?}, got {found}",
            slot.binding, slot.kind
        ))
    };

    match (slot.kind, resource) {
        (BindingKind::UniformBuffer, BindingRef::Buffer(id)) => {
            let buffer = scene
                .buffers
                .get(id.0)
                .ok_or_else(|| Error::mismatch(format!("bind group `{label}` names unknown buffer {}", id.0)))?;
            if buffer.kind != BufferKind::Uniform {
                return Err(wrong(&format!("buffer `{}` of kind {:?}", buffer.label, buffer.kind)));
            }
            check_min_size(buffer, slot)
        }
        (BindingKind::StorageBuffer { .. }, BindingRef::Buffer(id)) => {
            let buffer = scene
                .buffers
                .get(id.0)
                .ok_or_else(|| Error::mismatch(format!("bind group `{label}` names unknown buffer {}", id.0)))?;
            if buffer.kind != BufferKind::Storage {
                return Err(wrong(&format!("buffer `{}` of kind {:?}", buffer.label, buffer.kind)));
            }
            check_min_size(buffer, slot)
        }
        (BindingKind::Texture, BindingRef::Texture(id)) => {
            if scene.textures.get(id.0).is_none() {
                return Err(Error::mismatch(format!("bind group `{label}` names unknown texture {}", id.0)));
            }
            Ok(())
        }
        (BindingKind::Sampler, BindingRef::Sampler(id)) => {
            if scene.samplers.get(id.0).is_none() {
                return Err(Error::mismatch(format!("bind group `{label}` names unknown sampler {}", id.0)));
            }
            Ok(())
        }
        (_, BindingRef::Buffer(_)) => Err(wrong("a buffer")),
        (_, BindingRef::Texture(_)) => Err(wrong("a texture")),
        (_, BindingRef::Sampler(_)) => Err(wrong("a sampler")),
    }
}

fn check_min_size(buffer: &BufferDesc, slot: &ReflectedBinding) -> Result<()> {
    if let Some(min) = slot.min_size {
        let size = buffer.contents.byte_len();
        if size < min {
            return Err(Error::mismatch(format!(
                "buffer `{}` is {size} bytes but @binding({}) needs {min}",
                buffer.label, slot.binding
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::ShaderReflection;
    use crate::resources::{ImageSource, SamplerDesc, TextureSource};

    const SHADER: &str = r#"
@group(0) @binding(0) var<uniform> transforms: array<mat4x4<f32>, 3>;
@group(0) @binding(1) var color_texture: texture_2d<f32>;
@group(0) @binding(2) var color_sampler: sampler;
"#;

    fn reflected() -> Vec<ReflectedBinding> {
        ShaderReflection::parse("bindings", SHADER).unwrap().bindings(0)
    }

    fn scene() -> (SceneDesc, BindGroupDesc) {
        let mut scene = SceneDesc::new("bind");
        let uniform = scene.uniform_buffer("transforms", 192);
        let texture = scene.texture("wall", TextureSource::Image(ImageSource::checkerboard(4, 1)));
        let sampler = scene.sampler(SamplerDesc::linear("linear"));
        let group = BindGroupDesc {
            label: "group".into(),
            pipeline: crate::resources::PipelineId(0),
            group: 0,
            entries: vec![
                (0, BindingRef::Buffer(uniform)),
                (1, BindingRef::Texture(texture)),
                (2, BindingRef::Sampler(sampler)),
            ],
        };
        (scene, group)
    }

    #[test]
    fn complete_group_validates() {
        let (scene, group) = scene();
        validate_bind_group(&scene, &group, &reflected()).unwrap();
    }

    #[test]
    fn unset_slot_is_a_mismatch() {
        let (scene, mut group) = scene();
        group.entries.pop();
        assert!(validate_bind_group(&scene, &group, &reflected()).is_err());
    }

    #[test]
    fn undeclared_slot_is_a_mismatch() {
        let (scene, mut group) = scene();
        group.entries.push((7, group.entries[0].1));
        assert!(validate_bind_group(&scene, &group, &reflected()).is_err());
    }

    #[test]
    fn kind_swap_is_a_mismatch() {
        let (scene, mut group) = scene();
        group.entries.swap(1, 2);
        group.entries[1].0 = 1;
        group.entries[2].0 = 2;
        assert!(matches!(
            validate_bind_group(&scene, &group, &reflected()),
            Err(Error::ConfigurationMismatch(_))
        ));
    }

    #[test]
    fn undersized_uniform_is_a_mismatch() {
        let (mut scene, group) = scene();
        scene.buffers[0].contents = crate::resources::BufferContents::Zeroed(128);
        assert!(validate_bind_group(&scene, &group, &reflected()).is_err());
    }

    const STORAGE: &str = r#"
@group(0) @binding(0) var<storage, read> worlds: array<mat4x4<f32>, 16>;
@group(0) @binding(1) var<storage, read> tail: array<mat4x4<f32>>;
"#;

    fn storage_scene(fixed: u64, open: u64) -> (SceneDesc, BindGroupDesc) {
        let mut scene = SceneDesc::new("storage");
        let a = scene.storage_buffer("fixed", fixed);
        let b = scene.storage_buffer("open", open);
        let group = BindGroupDesc {
            label: "worlds".into(),
            pipeline: crate::resources::PipelineId(0),
            group: 0,
            entries: vec![(0, BindingRef::Buffer(a)), (1, BindingRef::Buffer(b))],
        };
        (scene, group)
    }

    #[test]
    fn undersized_storage_is_a_mismatch() {
        let reflected = ShaderReflection::parse("storage", STORAGE).unwrap().bindings(0);
        assert_eq!(reflected[0].min_size, Some(1024));
        assert_eq!(reflected[1].min_size, Some(64));

        let (scene, group) = storage_scene(1024, 64);
        validate_bind_group(&scene, &group, &reflected).unwrap();

        let (scene, group) = storage_scene(64, 64);
        assert!(matches!(
            validate_bind_group(&scene, &group, &reflected),
            Err(Error::ConfigurationMismatch(_))
        ));

        let (scene, group) = storage_scene(1024, 32);
        assert!(validate_bind_group(&scene, &group, &reflected).is_err());
    }
}
