use std::io::Write;
use std::path::Path;

use tracing::{info, instrument};

use crate::highlights::common::{Frame, FrameMut, HighlightError, Result};
use crate::highlights::opposed::{
    NullSink, OpposedConfig, OpposedProcessor, PipeContext, PipeKind, Reconstruction,
};
use crate::highlights::raw_io::{
    FrameWriter, RawFrameReader, RawLoaderReader, StandardTiffWriter, TiffCompression,
};

/// Decodes a RAW file, reconstructs its clipped highlights and writes the
/// result as a 16-bit TIFF.
pub struct HighlightPipeline<R: RawFrameReader, W: FrameWriter> {
    reader: R,
    writer: W,
    processor: OpposedProcessor,
    compression: TiffCompression,
}

impl HighlightPipeline<RawLoaderReader, StandardTiffWriter> {
    pub fn new(config: OpposedConfig, compression: TiffCompression) -> Self {
        Self::with_custom(RawLoaderReader, StandardTiffWriter, config, compression)
    }
}

impl<R: RawFrameReader, W: FrameWriter> HighlightPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: OpposedConfig, compression: TiffCompression) -> Self {
        Self {
            reader,
            writer,
            processor: OpposedProcessor::new(config),
            compression,
        }
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&mut self, input_data: &[u8], output: &mut dyn Write) -> Result<Reconstruction> {
        info!("Starting highlight reconstruction");

        let mut frame = {
            let _span = tracing::info_span!("decode_raw").entered();
            self.reader.read_frame(input_data)?
        };

        let reconstruction = {
            let _span = tracing::info_span!("reconstruct",
                width = frame.width,
                height = frame.height
            ).entered();
            let roi = frame.roi();
            let mut out = vec![0.0f32; frame.data.len()];
            let ctx = PipeContext::new(PipeKind::Export, frame.width, frame.height);
            let reconstruction = self.processor.process(
                Frame::new(&frame.data, roi),
                FrameMut::new(&mut out, roi),
                &frame.sensor,
                &frame.wb,
                frame.saturation,
                &ctx,
                &mut NullSink,
            )?;
            frame.data = out;
            reconstruction
        };

        {
            let _span = tracing::info_span!("encode_tiff").entered();
            self.writer.write_frame(&frame, output, self.compression)?;
        }

        let [red, green, blue] = reconstruction.chroma;
        info!(
            width = frame.width,
            height = frame.height,
            red,
            green,
            blue,
            elapsed = ?reconstruction.timings.total_duration(),
            "Reconstruction complete"
        );
        Ok(reconstruction)
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input_path: P,
        output_path: Q,
    ) -> Result<Reconstruction> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Processing file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                HighlightError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                HighlightError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.convert(&input_data, &mut output_file)
    }

    pub fn processor(&self) -> &OpposedProcessor {
        &self.processor
    }
}
