//! Offloaded opposed reconstruction
//!
//! The device runs the same four passes as the CPU path on a single stream.
//! Only Jetson builds compile it; elsewhere `CudaOpposed` is a stub whose
//! every call fails with `AcceleratorFailure`, so callers fall back to the CPU.

#[cfg(jetson_cuda)]
pub mod cuda_opposed;

/// Result of one device run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceRun {
    /// Chrominance applied to clipped photosites
    pub chroma: [f32; 3],
    /// Whether the estimation passes found clipped photosites
    pub any_clipped: bool,
}

#[cfg(not(jetson_cuda))]
pub struct CudaOpposed;

#[cfg(not(jetson_cuda))]
impl CudaOpposed {
    pub fn new() -> Result<Self> {
        Err(unavailable())
    }

    #[allow(unused, clippy::too_many_arguments)]
    pub fn process(
        &self,
        frame_in: Frame<'_>,
        frame_out: FrameMut<'_>,
        cfa: &CfaPattern,
        thresholds: &ClipThresholds,
        chroma: [f32; 3],
        estimate: bool,
        power: f32,
    ) -> Result<DeviceRun> {
        Err(unavailable())
    }
}

#[cfg(not(jetson_cuda))]
fn unavailable() -> HighlightError {
    HighlightError::AcceleratorFailure("CUDA is not available on this platform".to_string())
}

#[cfg(jetson_cuda)]
pub use cuda_opposed::CudaOpposed;

#[cfg(not(jetson_cuda))]
use crate::highlights::{
    common::{Frame, FrameMut, HighlightError, Result},
    opposed::ClipThresholds,
    sensor::CfaPattern,
};
