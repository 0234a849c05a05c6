//! RAW frame I/O module
//!
//! Decodes camera RAW files into normalized frames the reconstruction engine
//! accepts, and writes reconstructed frames back out as 16-bit TIFF.

mod reader;
mod rawloader_reader;
mod writer;
mod standard_tiff_writer;
mod pipeline;
pub mod types;

#[cfg(test)]
mod tests;

pub use reader::RawFrameReader;
pub use rawloader_reader::{sensor_layout, RawLoaderReader};
pub use writer::FrameWriter;
pub use standard_tiff_writer::StandardTiffWriter;
pub use pipeline::HighlightPipeline;
pub use types::{RawFrame, TiffCompression};
