//! Doubles an array on the GPU and reads it back. Runs without a window.

use anyhow::{Context, Result};
use primer_engine::compute::ComputeJob;
use primer_engine::device::{GpuInit, Headless};

pub const SHADER: &str = include_str!("../../shaders/double.wgsl");
pub const INPUT: [f32; 4] = [1.0, 2.0, 3.0, 4.0];

pub fn run() -> Result<()> {
    let gpu = Headless::acquire(GpuInit::default()).context("no GPU available for compute")?;
    log::info!("compute adapter: {}", gpu.adapter_info().name);

    let job = ComputeJob::new(gpu.context(), "double", SHADER, "main")?;
    let output = job
        .run_f32(gpu.context(), &INPUT)
        .context("compute dispatch failed")?;

    log::info!("{INPUT:?} doubled on the GPU: {output:?}");
    Ok(())
}
