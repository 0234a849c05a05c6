use crate::highlights::common::Result;
use crate::highlights::raw_io::types::RawFrame;

pub trait RawFrameReader {
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame>;
}
