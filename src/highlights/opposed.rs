//! Opposed-color highlight reconstruction
//!
//! This module estimates a per-channel chrominance offset from unclipped
//! photosites near clipped regions and uses it to rebuild clipped photosites
//! from the mean of the two opposed primaries around them.

pub mod types;
pub mod config;
pub mod timing;
pub mod refavg;
pub mod masks;
pub mod chroma;
pub mod reconstruct;
pub mod tag;
pub mod sink;
pub mod coordinator;


pub use types::{
    ChromaCorrection,
    ClipThresholds,
    EstimationOutcome,
    PipeContext,
    PipeKind,
    Reconstruction,
    WhiteBalance,
    CLIP_MAGIC,
    DARK_RATIOS,
    MASK_ALIGN,
    SRAW_DIM_TOLERANCE,
    TAG_TOLERANCE,
};

pub use config::{
    OpposedConfig,
    OpposedConfigBuilder,
    DEFAULT_POWER,
};

pub use timing::{PassTiming, PassTimings};
pub use masks::ClipMasks;
pub use chroma::ChromaAccumulator;
pub use tag::color_tag;
pub use sink::{NullSink, ParamsSink, RecordingSink};
pub use coordinator::{estimate_chroma, reconstruct, OpposedProcessor};
