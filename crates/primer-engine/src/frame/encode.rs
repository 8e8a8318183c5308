use crate::device::{validated, GpuContext};
use crate::error::{Error, Result};
use crate::resources::SceneResources;

use super::plan::{ColorTarget, FramePlan, FrameStep, LoadPolicy, PassCommand, PassPlan};

/// Replays a [`FramePlan`] on the device.
///
/// Queue writes are issued immediately (they land before the next submission),
/// passes are encoded into the open command encoder, and every
/// [`FrameStep::Submit`] finishes that encoder and submits it.
///
/// `surface_view` is the acquired backbuffer; plans that render into
/// [`ColorTarget::Surface`] fail without one. Anything the device rejects while
/// the plan is replayed is returned as [`Error::ConfigurationMismatch`].
pub fn execute_plan(
    ctx: GpuContext<'_>,
    resources: &SceneResources,
    surface_view: Option<&wgpu::TextureView>,
    plan: &FramePlan,
) -> Result<()> {
    validated(ctx.device, "frame plan", || replay(ctx, resources, surface_view, plan))
}

fn replay(
    ctx: GpuContext<'_>,
    resources: &SceneResources,
    surface_view: Option<&wgpu::TextureView>,
    plan: &FramePlan,
) -> Result<()> {
    let mut encoder: Option<wgpu::CommandEncoder> = None;

    for step in plan.steps() {
        match step {
            FrameStep::WriteBuffer { buffer, offset, data } => {
                ctx.queue.write_buffer(resources.buffer(*buffer)?, *offset, data);
            }
            FrameStep::Pass(pass) => {
                let encoder = encoder.get_or_insert_with(|| {
                    ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("primer frame encoder"),
                    })
                });
                encode_pass(encoder, resources, surface_view, pass)?;
            }
            FrameStep::Submit => match encoder.take() {
                Some(encoder) => {
                    ctx.queue.submit(std::iter::once(encoder.finish()));
                }
                // Writes alone still need a submission to be flushed in order.
                None => {
                    ctx.queue.submit(std::iter::empty());
                }
            },
        }
    }

    if encoder.is_some() {
        return Err(Error::mismatch("frame plan ended with unsubmitted passes"));
    }
    Ok(())
}

fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    resources: &SceneResources,
    surface_view: Option<&wgpu::TextureView>,
    pass: &PassPlan,
) -> Result<()> {
    let attachments = resources.attachments();

    let (view, resolve_target) = match pass.target {
        ColorTarget::Surface => {
            let surface = surface_view.ok_or_else(|| Error::mismatch("surface pass recorded without a backbuffer"))?;
            match attachments.msaa() {
                Some(msaa) => (&msaa.view, Some(surface)),
                None => (surface, None),
            }
        }
        ColorTarget::Texture(id) => (&resources.texture(id)?.view, None),
    };

    let color_load = match pass.color_load {
        LoadPolicy::Clear => wgpu::LoadOp::Clear(pass.clear_color),
        LoadPolicy::Load => wgpu::LoadOp::Load,
    };

    let depth_stencil_attachment = match pass.depth_load {
        Some(load) => {
            let depth = attachments
                .depth()
                .ok_or_else(|| Error::mismatch("depth pass recorded without a depth attachment"))?;
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: match load {
                        LoadPolicy::Clear => wgpu::LoadOp::Clear(1.0),
                        LoadPolicy::Load => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            })
        }
        None => None,
    };

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(&pass.label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: color_load,
                // Kept even when resolving: a later pass in the tick may load it.
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    for command in &pass.commands {
        match command {
            PassCommand::SetPipeline(id) => rpass.set_pipeline(resources.pipeline(*id)?),
            PassCommand::SetBindGroup { index, group } => {
                rpass.set_bind_group(*index, resources.bind_group(*group)?, &[]);
            }
            PassCommand::SetVertexBuffer { slot, buffer } => {
                rpass.set_vertex_buffer(*slot, resources.buffer(*buffer)?.slice(..));
            }
            PassCommand::SetIndexBuffer(buffer) => {
                let format = match resources.manifest().buffer(*buffer)?.class {
                    crate::resources::BufferClass::Index { format, .. } => format,
                    other => return Err(Error::mismatch(format!("{other:?} bound as index buffer"))),
                };
                rpass.set_index_buffer(resources.buffer(*buffer)?.slice(..), format);
            }
            PassCommand::Draw { vertices, instances } => rpass.draw(vertices.clone(), instances.clone()),
            PassCommand::DrawIndexed {
                indices,
                base_vertex,
                instances,
            } => rpass.draw_indexed(indices.clone(), *base_vertex, instances.clone()),
        }
    }

    Ok(())
}
