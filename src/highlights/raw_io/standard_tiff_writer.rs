use std::io::Write;

use tiff::encoder::{Compression, TiffEncoder, colortype, compression::DeflateLevel};
use tracing::debug;

use crate::highlights::common::{HighlightError, Result};
use crate::highlights::raw_io::types::{RawFrame, TiffCompression};
use crate::highlights::raw_io::writer::FrameWriter;
use crate::highlights::sensor::LINEAR_STRIDE;

pub struct StandardTiffWriter;

fn to_u16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
}

impl FrameWriter for StandardTiffWriter {
    fn write_frame(&self, frame: &RawFrame, output: &mut dyn Write, compression: TiffCompression) -> Result<()> {
        debug!("Encoding TIFF image: {}x{}", frame.width, frame.height);

        let mut buffer = Vec::new();

        let compression = match compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
        };

        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| HighlightError::EncodeError(e.to_string()))?
            .with_compression(compression);

        let (width, height) = (frame.width as u32, frame.height as u32);
        if frame.sensor.is_linear() {
            // drop the padding float of every sraw pixel
            let rgb: Vec<u16> = frame
                .data
                .chunks_exact(LINEAR_STRIDE)
                .flat_map(|px| [to_u16(px[0]), to_u16(px[1]), to_u16(px[2])])
                .collect();
            encoder
                .write_image::<colortype::RGB16>(width, height, &rgb)
                .map_err(|e| HighlightError::EncodeError(e.to_string()))?;
        } else {
            let gray: Vec<u16> = frame.data.iter().map(|&v| to_u16(v)).collect();
            encoder
                .write_image::<colortype::Gray16>(width, height, &gray)
                .map_err(|e| HighlightError::EncodeError(e.to_string()))?;
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
