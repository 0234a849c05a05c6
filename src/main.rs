use opposed_hl_rs::highlights::{
    CfaPattern, CudaOpposed, Frame, FrameMut, FrameWriter, OpposedConfig, OpposedProcessor,
    PipeContext, PipeKind, RawFrame, Roi, SensorLayout, StandardTiffWriter, WhiteBalance,
    raw_io::{HighlightPipeline, TiffCompression},
    opposed::RecordingSink,
};
use opposed_hl_rs::logger::{self, error, info, warn};

use anyhow::Context;

const SYNTHETIC_SIZE: usize = 96;

/// Bayer frame with a saturated disc over a warm gradient.
fn synthetic_frame() -> RawFrame {
    let size = SYNTHETIC_SIZE;
    let center = size as f32 / 2.0;
    let cfa = CfaPattern::bayer_rggb();
    let roi = Roi::new(size, size);
    let base = [0.55f32, 0.35, 0.2];

    let mut data = vec![0.0f32; size * size];
    for row in 0..size {
        for col in 0..size {
            let color = cfa.color_at(row, col, &roi);
            let dist = ((row as f32 - center).powi(2) + (col as f32 - center).powi(2)).sqrt();
            let gain = 1.0 + 2.5 * (1.0 - dist / center).max(0.0);
            data[row * size + col] = (base[color] * gain).min(1.0);
        }
    }

    RawFrame {
        width: size,
        height: size,
        data,
        sensor: SensorLayout::Mosaic(cfa),
        wb: WhiteBalance::disabled(),
        saturation: 1.0,
    }
}

fn run_synthetic(output_path: &str) -> anyhow::Result<()> {
    let mut frame = synthetic_frame();
    let roi = frame.roi();
    let ctx = PipeContext::new(PipeKind::Full, frame.width, frame.height).altered(true);
    let mut processor = OpposedProcessor::new(OpposedConfig::default());
    let mut sink = RecordingSink::default();
    let mut out = vec![0.0f32; frame.data.len()];

    let offloaded = match (CudaOpposed::new(), &frame.sensor) {
        (Ok(device), SensorLayout::Mosaic(cfa)) => processor
            .process_offloaded(
                &device,
                Frame::new(&frame.data, roi),
                FrameMut::new(&mut out, roi),
                cfa,
                &frame.wb,
                frame.saturation,
                &ctx,
                &mut sink,
            )
            .map_err(|e| warn!(error = %e, "Device path failed, using CPU"))
            .ok(),
        (Err(e), _) => {
            info!(reason = %e, "Using CPU path");
            None
        }
        _ => None,
    };

    let chroma = match offloaded {
        Some(chroma) => chroma,
        None => {
            let reconstruction = processor.process(
                Frame::new(&frame.data, roi),
                FrameMut::new(&mut out, roi),
                &frame.sensor,
                &frame.wb,
                frame.saturation,
                &ctx,
                &mut sink,
            )?;
            for step in reconstruction.timings.steps() {
                info!(step = %step.name, duration = ?step.duration, "Pass timing");
            }
            reconstruction.chroma
        }
    };

    info!(?chroma, published = sink.history_items, "Synthetic frame reconstructed");

    frame.data = out;
    let mut file = std::fs::File::create(output_path)
        .with_context(|| format!("creating {output_path}"))?;
    StandardTiffWriter.write_frame(&frame, &mut file, TiffCompression::None)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logger::init();

    info!("Starting opposed highlight reconstruction...");

    let mut args = std::env::args().skip(1);
    let input = args.next();
    let output = args.next().unwrap_or_else(|| "output.tiff".to_string());

    let result = match input {
        Some(input) => {
            let mut pipeline = HighlightPipeline::new(OpposedConfig::default(), TiffCompression::None);
            info!(power = pipeline.processor().config().power, "Pipeline initialized");
            pipeline.convert_file(&input, &output).map(|_| ()).map_err(anyhow::Error::from)
        }
        None => {
            info!("No input given, reconstructing a synthetic frame");
            run_synthetic(&output)
        }
    };

    match result {
        Ok(()) => info!(output = %output, "Reconstruction successful!"),
        Err(e) => {
            error!("Reconstruction failed: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}
