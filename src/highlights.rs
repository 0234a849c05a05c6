//! Highlight reconstruction module
//!
//! This module provides the opposed-color reconstruction engine for
//! CFA-pattern and sraw frames, its optional CUDA path, and the raw/TIFF
//! I/O used by the command line harness.

pub mod common;
pub mod sensor;
pub mod opposed;
pub mod accel;
pub mod raw_io;

pub use common::{
    Frame,
    FrameMut,
    HighlightError,
    Result,
    Roi,
};

pub use sensor::{CfaPattern, SensorLayout};

pub use opposed::{
    ChromaCorrection,
    OpposedConfig,
    OpposedConfigBuilder,
    OpposedProcessor,
    PipeContext,
    PipeKind,
    Reconstruction,
    WhiteBalance,
};

pub use accel::{CudaOpposed, DeviceRun};

pub use raw_io::{
    FrameWriter,
    RawFrame,
    RawFrameReader,
    RawLoaderReader,
    StandardTiffWriter,
};
