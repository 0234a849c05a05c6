use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use crate::highlights::common::{HighlightError, Result};
use crate::highlights::opposed::{EstimationOutcome, OpposedConfig, WhiteBalance};
use crate::highlights::raw_io::{
    FrameWriter, HighlightPipeline, RawFrame, RawFrameReader, StandardTiffWriter, TiffCompression,
};
use crate::highlights::sensor::{CfaPattern, LINEAR_STRIDE, SensorLayout};

struct MockReader {
    should_fail: bool,
    mock_frame: Option<RawFrame>,
}

impl RawFrameReader for MockReader {
    fn read_frame(&self, _data: &[u8]) -> Result<RawFrame> {
        if self.should_fail {
            return Err(HighlightError::DecodeError("Mock decode error".to_string()));
        }
        Ok(self.mock_frame.clone().unwrap_or_else(|| flat_frame(12, 12, 0.2)))
    }
}

struct MockWriter {
    should_fail: bool,
    written_data: Arc<Mutex<Vec<RawFrame>>>,
}

impl FrameWriter for MockWriter {
    fn write_frame(&self, frame: &RawFrame, _output: &mut dyn Write, _compression: TiffCompression) -> Result<()> {
        if self.should_fail {
            return Err(HighlightError::EncodeError("Mock encode error".to_string()));
        }
        self.written_data.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

fn flat_frame(width: usize, height: usize, value: f32) -> RawFrame {
    RawFrame {
        width,
        height,
        data: vec![value; width * height],
        sensor: SensorLayout::Mosaic(CfaPattern::bayer_rggb()),
        wb: WhiteBalance::disabled(),
        saturation: 1.0,
    }
}

fn pipeline(reader: MockReader, writer: MockWriter) -> HighlightPipeline<MockReader, MockWriter> {
    HighlightPipeline::with_custom(reader, writer, OpposedConfig::default(), TiffCompression::None)
}

#[test]
fn test_successful_conversion() {
    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: false, mock_frame: None };
    let writer = MockWriter { should_fail: false, written_data: written.clone() };

    let mut pipeline = pipeline(reader, writer);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake raw data", &mut output).unwrap();

    assert_eq!(
        result.outcome,
        EstimationOutcome::Estimated { any_clipped: false, published: false }
    );
    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert!(written[0].data.iter().all(|&v| v == 0.2));
}

#[test]
fn test_reader_failure() {
    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: true, mock_frame: None };
    let writer = MockWriter { should_fail: false, written_data: written.clone() };

    let mut pipeline = pipeline(reader, writer);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake raw data", &mut output);

    assert!(matches!(result, Err(HighlightError::DecodeError(_))));
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_writer_failure() {
    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: false, mock_frame: None };
    let writer = MockWriter { should_fail: true, written_data: written };

    let mut pipeline = pipeline(reader, writer);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake raw data", &mut output);

    assert!(matches!(result, Err(HighlightError::EncodeError(_))));
}

#[test]
fn test_clipped_frame_is_reconstructed_before_writing() {
    let mut frame = flat_frame(12, 12, 0.3);
    // clip a red photosite in the interior
    frame.data[6 * 12 + 6] = 1.0;

    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: false, mock_frame: Some(frame) };
    let writer = MockWriter { should_fail: false, written_data: written.clone() };

    let mut pipeline = pipeline(reader, writer);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake raw data", &mut output).unwrap();

    assert!(matches!(result.outcome, EstimationOutcome::Estimated { any_clipped: true, .. }));
    {
        let written = written.lock().unwrap();
        assert!(written[0].data[6 * 12 + 6] >= 1.0);
    }

    // second frame with identical inputs reuses the cached correction
    let result = pipeline.convert(b"fake raw data", &mut output).unwrap();
    assert_eq!(result.outcome, EstimationOutcome::CacheHit);

    let written = written.lock().unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].data, written[1].data);
}

#[test]
fn test_convert_file_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: false, mock_frame: None };
    let writer = MockWriter { should_fail: false, written_data: written };

    let mut pipeline = pipeline(reader, writer);
    let result = pipeline.convert_file(dir.path().join("missing.arw"), dir.path().join("out.tiff"));

    assert!(matches!(result, Err(HighlightError::InputReadError(_))));
}

#[test]
fn test_tiff_writer_mosaic() {
    let frame = flat_frame(8, 6, 0.5);
    let mut output = Cursor::new(Vec::new());
    StandardTiffWriter
        .write_frame(&frame, &mut output, TiffCompression::Deflate)
        .unwrap();

    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(output.into_inner())).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (8, 6));
    assert_eq!(decoder.colortype().unwrap(), tiff::ColorType::Gray(16));
}

#[test]
fn test_tiff_writer_linear_to_file() {
    let frame = RawFrame {
        width: 4,
        height: 3,
        data: vec![0.25; 4 * 3 * LINEAR_STRIDE],
        sensor: SensorLayout::Linear,
        wb: WhiteBalance::disabled(),
        saturation: 1.0,
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear.tiff");
    let mut file = std::fs::File::create(&path).unwrap();
    StandardTiffWriter
        .write_frame(&frame, &mut file, TiffCompression::Lzw)
        .unwrap();
    drop(file);

    let bytes = std::fs::read(&path).unwrap();
    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (4, 3));
    assert_eq!(decoder.colortype().unwrap(), tiff::ColorType::RGB(16));
}
