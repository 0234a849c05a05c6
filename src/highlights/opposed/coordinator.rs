//! Correction cache coordinator
//!
//! Decides per call whether the stored chrominance is still valid for the
//! incoming frame, re-estimates it when not, publishes fresh corrections to
//! the caller's sink and finally runs the reconstruction pass.

use tracing::{debug, info, instrument, warn};

use crate::highlights::accel::CudaOpposed;
use crate::highlights::common::{Frame, FrameMut, HighlightError, Result, Roi};
use crate::highlights::opposed::chroma::{accumulate_linear, accumulate_mosaic};
use crate::highlights::opposed::config::{OpposedConfig, effective_power};
use crate::highlights::opposed::masks::ClipMasks;
use crate::highlights::opposed::reconstruct::{
    ReconstructParams, crop_into, pass_through, reconstruct_linear_into, reconstruct_mosaic_into,
    try_alloc_frame,
};
use crate::highlights::opposed::sink::ParamsSink;
use crate::highlights::opposed::tag::color_tag;
use crate::highlights::opposed::timing::{
    PassTimings, STEP_BUILD_MASKS, STEP_DILATE_MASKS, STEP_ESTIMATE_CHROMA, STEP_RECONSTRUCT,
};
use crate::highlights::opposed::types::{
    ChromaCorrection, ClipThresholds, EstimationOutcome, PipeContext, PipeKind, Reconstruction,
    SRAW_DIM_TOLERANCE, WhiteBalance,
};
use crate::highlights::sensor::{CfaPattern, SensorLayout};

/// Runs the mask, dilation and accumulation passes over a whole input frame.
///
/// Returns `Ok(None)` when no photosite is clipped, in which case the
/// previous correction stays in force. The scratch masks live only for the
/// duration of this call.
#[instrument(level = "debug", skip_all)]
pub fn estimate_chroma(
    input: &[f32],
    roi: &Roi,
    sensor: &SensorLayout,
    thresholds: &ClipThresholds,
    power: f32,
    timings: &mut PassTimings,
) -> Result<Option<[f32; 3]>> {
    debug!("Estimating chrominance correction");
    let mut masks = ClipMasks::allocate(roi.width, roi.height)?;

    let any_clipped = timings.measure(STEP_BUILD_MASKS, || match sensor {
        SensorLayout::Mosaic(cfa) => masks.build_mosaic(input, roi, cfa, thresholds),
        SensorLayout::Linear => masks.build_linear(input, roi, thresholds),
    });
    if !any_clipped {
        debug!("No clipped photosites");
        return Ok(None);
    }

    timings.measure(STEP_DILATE_MASKS, || masks.dilate());

    let acc = timings.measure(STEP_ESTIMATE_CHROMA, || match sensor {
        SensorLayout::Mosaic(cfa) => accumulate_mosaic(input, roi, cfa, thresholds, &masks, power),
        SensorLayout::Linear => accumulate_linear(input, roi, thresholds, &masks, power),
    });
    debug!(samples = ?acc.count, "Accumulated chrominance samples");
    Ok(Some(acc.finish()))
}

/// Reconstructs clipped highlights of `frame_in` into `frame_out`.
///
/// `state` is the correction cached on the caller's processor instance. It
/// is re-estimated when its tag no longer matches the inputs and `quality`
/// is set; fresh corrections go to `sink` when the frame comes from the full
/// pipeline of an already edited image. With `keep_input_copy` the whole
/// reconstructed input is returned as well.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(width = frame_in.roi.width, height = frame_in.roi.height))]
pub fn reconstruct<S: ParamsSink + ?Sized>(
    frame_in: Frame<'_>,
    frame_out: FrameMut<'_>,
    sensor: &SensorLayout,
    wb: &WhiteBalance,
    saturation: f32,
    quality: bool,
    keep_input_copy: bool,
    power: f32,
    state: &mut ChromaCorrection,
    ctx: &PipeContext,
    sink: &mut S,
) -> Result<Reconstruction> {
    let stride = sensor.stride();
    let (roi_in, roi_out) = (frame_in.roi, frame_out.roi);
    roi_in.check_buffer(frame_in.data.len(), stride)?;
    roi_out.check_buffer(frame_out.data.len(), stride)?;
    let power = effective_power(power);

    let mut timings = PassTimings::new();

    if let Err(e) = check_dimensions(&roi_in) {
        warn!(error = %e, "Passing frame through unchanged");
        pass_through(frame_in.data, &roi_in, frame_out.data, &roi_out, stride);
        return Ok(Reconstruction {
            keep_buffer: None,
            chroma: state.chroma,
            outcome: EstimationOutcome::PassThrough,
            timings,
        });
    }

    let thresholds = ClipThresholds::new(saturation, wb);
    let tag = color_tag(sensor, wb, saturation, power);
    let mut chroma = state.chroma;

    let outcome = if state.matches(tag) {
        debug!("Chrominance correction still valid");
        EstimationOutcome::CacheHit
    } else if !quality {
        debug!("Quality mode off, applying stored chrominance");
        EstimationOutcome::SkippedLowQuality
    } else {
        match estimate_chroma(frame_in.data, &roi_in, sensor, &thresholds, power, &mut timings) {
            Ok(estimate) => {
                let any_clipped = estimate.is_some();
                chroma = estimate.unwrap_or(state.chroma);
                let published = commit(
                    state,
                    ChromaCorrection::new(chroma, tag),
                    &thresholds,
                    ctx,
                    &roi_out,
                    sensor.is_linear(),
                    sink,
                );
                EstimationOutcome::Estimated {
                    any_clipped,
                    published,
                }
            }
            Err(HighlightError::AllocationFailed(bytes)) => {
                warn!(bytes, "Clip masks unavailable, applying stored chrominance");
                EstimationOutcome::AllocationFallback
            }
            Err(e) => return Err(e),
        }
    };

    let params = ReconstructParams {
        thresholds,
        chroma,
        power,
    };
    let keep_buffer = timings.measure(STEP_RECONSTRUCT, || {
        reconstruct_frame(
            frame_in.data,
            &roi_in,
            frame_out.data,
            &roi_out,
            sensor,
            &params,
            keep_input_copy,
        )
    });

    Ok(Reconstruction {
        keep_buffer,
        chroma,
        outcome,
        timings,
    })
}

fn check_dimensions(roi: &Roi) -> Result<()> {
    if roi.width < 3 || roi.height < 3 {
        return Err(HighlightError::InvalidDimensions(roi.width, roi.height));
    }
    Ok(())
}

fn reconstruct_region(
    input: &[f32],
    roi_in: &Roi,
    output: &mut [f32],
    roi_out: &Roi,
    sensor: &SensorLayout,
    params: &ReconstructParams,
) {
    match sensor {
        SensorLayout::Mosaic(cfa) => reconstruct_mosaic_into(input, roi_in, output, roi_out, cfa, params),
        SensorLayout::Linear => reconstruct_linear_into(input, roi_in, output, roi_out, params),
    }
}

fn reconstruct_frame(
    input: &[f32],
    roi_in: &Roi,
    output: &mut [f32],
    roi_out: &Roi,
    sensor: &SensorLayout,
    params: &ReconstructParams,
    keep: bool,
) -> Option<Vec<f32>> {
    let stride = sensor.stride();
    if keep {
        match try_alloc_frame(roi_in.photosites() * stride) {
            Ok(mut full) => {
                let full_roi = Roi::new(roi_in.width, roi_in.height);
                reconstruct_region(input, roi_in, &mut full, &full_roi, sensor, params);
                crop_into(&full, roi_in, output, roi_out, stride);
                return Some(full);
            }
            Err(e) => warn!(error = %e, "Reconstructing output region only"),
        }
    }
    reconstruct_region(input, roi_in, output, roi_out, sensor, params);
    None
}

/// Stores a fresh correction on the instance and publishes it when allowed.
fn commit<S: ParamsSink + ?Sized>(
    state: &mut ChromaCorrection,
    correction: ChromaCorrection,
    thresholds: &ClipThresholds,
    ctx: &PipeContext,
    roi_out: &Roi,
    linear: bool,
    sink: &mut S,
) -> bool {
    *state = correction;
    let [red, green, blue] = correction.chroma;
    info!(red, green, blue, tag = correction.tag, "New chrominance correction");

    for (c, (&chroma, &clip)) in correction.chroma.iter().zip(&thresholds.clips).enumerate() {
        if chroma.abs() > clip {
            warn!(channel = c, chroma, clip, "Chrominance correction exceeds clip threshold");
        }
    }

    if !should_publish(ctx, roi_out, linear) {
        return false;
    }
    sink.store_chroma(&correction);
    sink.add_history_item();
    info!("Published chrominance correction to history");
    true
}

fn should_publish(ctx: &PipeContext, roi_out: &Roi, linear: bool) -> bool {
    if ctx.kind != PipeKind::Full || !ctx.image_altered {
        return false;
    }
    !linear || covers_source(ctx, roi_out)
}

// sraw frames may be scaled; only publish when the output maps back onto the whole source
fn covers_source(ctx: &PipeContext, roi_out: &Roi) -> bool {
    let scale = if roi_out.scale > 0.0 { roi_out.scale } else { 1.0 };
    let width = (roi_out.width as f32 / scale) as i64;
    let height = (roi_out.height as f32 / scale) as i64;
    (width - ctx.source_width as i64).abs() < SRAW_DIM_TOLERANCE
        && (height - ctx.source_height as i64).abs() < SRAW_DIM_TOLERANCE
}

/// Opposed highlight reconstruction bound to one image: owns the
/// configuration and the cached chrominance correction.
pub struct OpposedProcessor {
    config: OpposedConfig,
    state: ChromaCorrection,
}

impl OpposedProcessor {
    pub fn new(config: OpposedConfig) -> Self {
        Self {
            config,
            state: ChromaCorrection::default(),
        }
    }

    /// Resumes from a correction previously read back from the edit history.
    pub fn with_state(config: OpposedConfig, state: ChromaCorrection) -> Self {
        Self { config, state }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process<S: ParamsSink + ?Sized>(
        &mut self,
        frame_in: Frame<'_>,
        frame_out: FrameMut<'_>,
        sensor: &SensorLayout,
        wb: &WhiteBalance,
        saturation: f32,
        ctx: &PipeContext,
        sink: &mut S,
    ) -> Result<Reconstruction> {
        reconstruct(
            frame_in,
            frame_out,
            sensor,
            wb,
            saturation,
            self.config.quality,
            self.config.keep_input_copy,
            self.config.power,
            &mut self.state,
            ctx,
            sink,
        )
    }

    /// Runs the same sequence on the device. Any device error is returned so
    /// the caller can retry with [`process`](Self::process); the cached
    /// correction is only updated after the device finished.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(width = frame_in.roi.width, height = frame_in.roi.height))]
    pub fn process_offloaded<S: ParamsSink + ?Sized>(
        &mut self,
        device: &CudaOpposed,
        frame_in: Frame<'_>,
        frame_out: FrameMut<'_>,
        cfa: &CfaPattern,
        wb: &WhiteBalance,
        saturation: f32,
        ctx: &PipeContext,
        sink: &mut S,
    ) -> Result<[f32; 3]> {
        let (roi_in, roi_out) = (frame_in.roi, frame_out.roi);
        roi_in.check_buffer(frame_in.data.len(), 1)?;
        roi_out.check_buffer(frame_out.data.len(), 1)?;
        check_dimensions(&roi_in)?;

        let sensor = SensorLayout::Mosaic(*cfa);
        let power = effective_power(self.config.power);
        let thresholds = ClipThresholds::new(saturation, wb);
        let tag = color_tag(&sensor, wb, saturation, power);
        let estimate = self.config.quality && !self.state.matches(tag);

        let run = device.process(frame_in, frame_out, cfa, &thresholds, self.state.chroma, estimate, power)?;

        if estimate {
            commit(
                &mut self.state,
                ChromaCorrection::new(run.chroma, tag),
                &thresholds,
                ctx,
                &roi_out,
                false,
                sink,
            );
        }
        Ok(run.chroma)
    }

    pub fn state(&self) -> &ChromaCorrection {
        &self.state
    }

    /// Forgets the cached correction so the next frame is estimated again.
    pub fn reset(&mut self) {
        self.state = ChromaCorrection::default();
    }

    pub fn config(&self) -> &OpposedConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OpposedConfig) {
        self.config = config;
    }
}
