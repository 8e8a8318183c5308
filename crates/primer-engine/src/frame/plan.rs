use std::ops::Range;

use crate::resources::{BindGroupId, BufferId, PipelineId, TextureId};

/// Color attachment a pass renders into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColorTarget {
    /// The acquired backbuffer, directly or through the multisampled target
    /// resolving into it.
    Surface,
    /// An offscreen render-target texture.
    Texture(TextureId),
}

/// What happens to an attachment's previous contents when a pass opens.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadPolicy {
    Clear,
    Load,
}

/// One recorded render-pass command, replayed in order by the encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum PassCommand {
    SetPipeline(PipelineId),
    SetBindGroup { index: u32, group: BindGroupId },
    SetVertexBuffer { slot: u32, buffer: BufferId },
    SetIndexBuffer(BufferId),
    Draw { vertices: Range<u32>, instances: Range<u32> },
    DrawIndexed { indices: Range<u32>, base_vertex: i32, instances: Range<u32> },
}

impl PassCommand {
    #[inline]
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawIndexed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    pub label: String,
    pub target: ColorTarget,
    pub color_load: LoadPolicy,
    pub clear_color: wgpu::Color,
    /// `None` when the pass has no depth attachment.
    pub depth_load: Option<LoadPolicy>,
    pub commands: Vec<PassCommand>,
}

impl PassPlan {
    pub fn draws(&self) -> impl Iterator<Item = &PassCommand> {
        self.commands.iter().filter(|c| c.is_draw())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStep {
    /// Queue-level write, visible to every command of the next submission.
    WriteBuffer { buffer: BufferId, offset: u64, data: Vec<u8> },
    Pass(PassPlan),
    /// Everything encoded since the previous boundary is submitted as one batch.
    Submit,
}

/// Per-tick counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub writes: u32,
    pub bytes_written: u64,
    pub passes: u32,
    pub draws: u32,
    pub indexed_draws: u32,
    pub submissions: u32,
}

/// CPU-side record of one tick: queue writes, passes and submission boundaries.
///
/// Produced by [`FrameState::finish`](super::FrameState::finish); always ends with
/// a [`FrameStep::Submit`] unless it is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    steps: Vec<FrameStep>,
}

impl FramePlan {
    pub(crate) fn from_steps(steps: Vec<FrameStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[FrameStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn passes(&self) -> impl Iterator<Item = &PassPlan> {
        self.steps.iter().filter_map(|s| match s {
            FrameStep::Pass(p) => Some(p),
            _ => None,
        })
    }

    /// Splits the plan at its submission boundaries.
    pub fn submissions(&self) -> Vec<Submission<'_>> {
        self.steps
            .split_inclusive(|s| matches!(s, FrameStep::Submit))
            .map(|steps| Submission { steps })
            .collect()
    }

    pub fn stats(&self) -> FrameStats {
        let mut stats = FrameStats::default();
        for step in &self.steps {
            match step {
                FrameStep::WriteBuffer { data, .. } => {
                    stats.writes += 1;
                    stats.bytes_written += data.len() as u64;
                }
                FrameStep::Pass(pass) => {
                    stats.passes += 1;
                    for cmd in pass.draws() {
                        match cmd {
                            PassCommand::DrawIndexed { .. } => stats.indexed_draws += 1,
                            _ => stats.draws += 1,
                        }
                    }
                }
                FrameStep::Submit => stats.submissions += 1,
            }
        }
        stats
    }
}

/// The steps of one queue submission, boundary included.
#[derive(Debug, Copy, Clone)]
pub struct Submission<'a> {
    steps: &'a [FrameStep],
}

impl<'a> Submission<'a> {
    pub fn steps(&self) -> &'a [FrameStep] {
        self.steps
    }

    pub fn passes(&self) -> impl Iterator<Item = &'a PassPlan> {
        self.steps.iter().filter_map(|s| match s {
            FrameStep::Pass(p) => Some(p),
            _ => None,
        })
    }

    /// Contents of `buffer` as every command of this submission observes it.
    ///
    /// Queue writes land before the submission's commands execute, in record
    /// order, so overlapping writes resolve to the last one. `before` is the
    /// buffer's contents prior to the submission.
    pub fn effective_bytes(&self, buffer: BufferId, before: &[u8]) -> Vec<u8> {
        let mut bytes = before.to_vec();
        for step in self.steps {
            if let FrameStep::WriteBuffer { buffer: b, offset, data } = step {
                if *b != buffer {
                    continue;
                }
                let start = *offset as usize;
                let end = start + data.len();
                if bytes.len() < end {
                    bytes.resize(end, 0);
                }
                bytes[start..end].copy_from_slice(data);
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(buffer: usize, offset: u64, data: &[u8]) -> FrameStep {
        FrameStep::WriteBuffer {
            buffer: BufferId(buffer),
            offset,
            data: data.to_vec(),
        }
    }

    fn pass(draws: usize) -> FrameStep {
        FrameStep::Pass(PassPlan {
            label: "p".into(),
            target: ColorTarget::Surface,
            color_load: LoadPolicy::Clear,
            clear_color: wgpu::Color::BLACK,
            depth_load: None,
            commands: (0..draws)
                .map(|_| PassCommand::Draw {
                    vertices: 0..3,
                    instances: 0..1,
                })
                .collect(),
        })
    }

    #[test]
    fn last_write_wins_within_a_submission() {
        let plan = FramePlan::from_steps(vec![
            write(0, 0, &[1, 1, 1, 1]),
            write(0, 0, &[2, 2, 2, 2]),
            write(0, 2, &[3, 3]),
            pass(1),
            FrameStep::Submit,
        ]);
        let subs = plan.submissions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].effective_bytes(BufferId(0), &[0; 4]), vec![2, 2, 3, 3]);
    }

    #[test]
    fn writes_to_other_buffers_are_ignored() {
        let plan = FramePlan::from_steps(vec![write(1, 0, &[9; 4]), FrameStep::Submit]);
        assert_eq!(plan.submissions()[0].effective_bytes(BufferId(0), &[5; 4]), vec![5; 4]);
    }

    #[test]
    fn submissions_split_at_boundaries() {
        let plan = FramePlan::from_steps(vec![
            write(0, 0, &[1; 4]),
            pass(1),
            FrameStep::Submit,
            write(0, 0, &[2; 4]),
            pass(1),
            FrameStep::Submit,
        ]);
        let subs = plan.submissions();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].effective_bytes(BufferId(0), &[0; 4]), vec![1; 4]);
        assert_eq!(subs[1].effective_bytes(BufferId(0), &[0; 4]), vec![2; 4]);
        assert_eq!(subs[1].passes().count(), 1);
    }

    #[test]
    fn stats_count_everything() {
        let plan = FramePlan::from_steps(vec![write(0, 0, &[0; 8]), pass(3), pass(2), FrameStep::Submit]);
        let stats = plan.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.bytes_written, 8);
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.draws, 5);
        assert_eq!(stats.indexed_draws, 0);
        assert_eq!(stats.submissions, 1);
    }
}
