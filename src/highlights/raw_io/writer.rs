use std::io::Write;

use crate::highlights::common::Result;
use crate::highlights::raw_io::types::{RawFrame, TiffCompression};

pub trait FrameWriter {
    fn write_frame(&self, frame: &RawFrame, output: &mut dyn Write, compression: TiffCompression) -> Result<()>;
}
