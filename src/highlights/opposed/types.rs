//! Types for opposed-color highlight reconstruction

use crate::highlights::opposed::timing::PassTimings;

/// Fraction of the white point above which a photosite counts as clipped.
pub const CLIP_MAGIC: f32 = 0.987;
/// Per-primary fraction of the clip threshold below which photosites are too dark to sample.
pub const DARK_RATIOS: [f32; 3] = [0.03, 0.125, 0.03];
/// Two tags closer than this are the same tag.
pub const TAG_TOLERANCE: f32 = 1e-6;
/// Maximum distance, in photosites, between a scaled sraw output and its source.
pub const SRAW_DIM_TOLERANCE: i64 = 10;
/// Alignment, in elements, of one coarse mask plane.
pub const MASK_ALIGN: usize = 64;

/// White balance coefficients of the pipeline feeding the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalance {
    /// Red, green and blue multipliers
    pub coeffs: [f32; 3],
    /// Whether the pipeline applied the multipliers upstream
    pub enabled: bool,
}

impl WhiteBalance {
    pub fn new(coeffs: [f32; 3]) -> Self {
        Self {
            coeffs,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            coeffs: [1.0; 3],
            enabled: false,
        }
    }

    /// Coefficients the thresholds scale with; unity when white balance is off.
    pub fn effective(&self) -> [f32; 3] {
        if self.enabled { self.coeffs } else { [1.0; 3] }
    }
}

impl Default for WhiteBalance {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Per-primary clipping and dark thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipThresholds {
    pub clips: [f32; 3],
    pub dark: [f32; 3],
}

impl ClipThresholds {
    pub fn new(saturation: f32, wb: &WhiteBalance) -> Self {
        let clipval = CLIP_MAGIC * saturation;
        let coeffs = wb.effective();
        let clips = [clipval * coeffs[0], clipval * coeffs[1], clipval * coeffs[2]];
        let dark = [
            DARK_RATIOS[0] * clips[0],
            DARK_RATIOS[1] * clips[1],
            DARK_RATIOS[2] * clips[2],
        ];
        Self { clips, dark }
    }

    /// Thresholds given directly, bypassing the saturation and white balance scaling.
    pub fn from_clips(clips: [f32; 3]) -> Self {
        let dark = [
            DARK_RATIOS[0] * clips[0],
            DARK_RATIOS[1] * clips[1],
            DARK_RATIOS[2] * clips[2],
        ];
        Self { clips, dark }
    }

    #[inline]
    pub fn is_clipped(&self, value: f32, color: usize) -> bool {
        value >= self.clips[color]
    }

    /// Unclipped but bright enough to carry color information.
    #[inline]
    pub fn is_sample(&self, value: f32, color: usize) -> bool {
        value > self.dark[color] && value < self.clips[color]
    }
}

/// Cached chrominance correction plus the tag it is valid for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaCorrection {
    /// Per-primary offsets added to the reference average
    pub chroma: [f32; 3],
    /// Fingerprint of the inputs the offsets were estimated from
    pub tag: f32,
}

impl ChromaCorrection {
    pub fn new(chroma: [f32; 3], tag: f32) -> Self {
        Self { chroma, tag }
    }

    pub fn matches(&self, tag: f32) -> bool {
        (self.tag - tag).abs() < TAG_TOLERANCE
    }

    /// Four floats in the order the edit history stores them.
    pub fn to_array(&self) -> [f32; 4] {
        [self.chroma[0], self.chroma[1], self.chroma[2], self.tag]
    }

    pub fn from_array(values: [f32; 4]) -> Self {
        Self {
            chroma: [values[0], values[1], values[2]],
            tag: values[3],
        }
    }
}

impl Default for ChromaCorrection {
    /// Never estimated: tags live in `[1, 2)` so `0.0` matches nothing.
    fn default() -> Self {
        Self {
            chroma: [0.0; 3],
            tag: 0.0,
        }
    }
}

/// Kind of pipeline a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    /// Full-resolution editing pipeline
    Full,
    /// Downscaled navigation preview
    Preview,
    /// File export
    Export,
    /// Thumbnail generation
    Thumbnail,
}

/// What the caller knows about the pipeline running the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeContext {
    pub kind: PipeKind,
    /// The image already carries user edits
    pub image_altered: bool,
    /// Width of the full source image
    pub source_width: usize,
    /// Height of the full source image
    pub source_height: usize,
}

impl PipeContext {
    pub fn new(kind: PipeKind, source_width: usize, source_height: usize) -> Self {
        Self {
            kind,
            image_altered: false,
            source_width,
            source_height,
        }
    }

    pub fn altered(mut self, image_altered: bool) -> Self {
        self.image_altered = image_altered;
        self
    }
}

/// How the chrominance used for a call was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimationOutcome {
    /// Stored tag matched; estimation skipped
    CacheHit,
    /// Masks and chrominance recomputed
    Estimated { any_clipped: bool, published: bool },
    /// Quality mode off; stored chrominance used verbatim
    SkippedLowQuality,
    /// Scratch masks could not be allocated; stored chrominance used
    AllocationFallback,
    /// Frame too small to reconstruct; copied through
    PassThrough,
}

/// Result of one reconstruction call
#[derive(Debug)]
pub struct Reconstruction {
    /// Reconstructed input-sized frame, when the caller asked to keep it
    pub keep_buffer: Option<Vec<f32>>,
    /// Chrominance actually applied
    pub chroma: [f32; 3],
    pub outcome: EstimationOutcome,
    /// Wall time of each pass that ran
    pub timings: PassTimings,
}

impl Reconstruction {
    pub fn estimated(&self) -> bool {
        matches!(self.outcome, EstimationOutcome::Estimated { .. })
    }
}
