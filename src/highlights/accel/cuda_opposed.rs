use cudarc::driver::safe::*;
use cudarc::nvrtc::Ptx;
use std::sync::Arc;
use tracing::debug;

use super::DeviceRun;
use crate::highlights::common::{Frame, FrameMut, HighlightError, Result};
use crate::highlights::opposed::{ClipThresholds, MASK_ALIGN};
use crate::highlights::sensor::CfaPattern;

const BLOCK: usize = 16;

/// Opposed highlight kernels loaded on the first CUDA device
pub struct CudaOpposed {
    stream: Arc<CudaStream>,
    init_mask: CudaFunction,
    dilate_mask: CudaFunction,
    chroma: CudaFunction,
    reconstruct: CudaFunction,
}

fn grid(width: usize, height: usize) -> LaunchConfig {
    LaunchConfig {
        grid_dim: (width.div_ceil(BLOCK) as u32, height.div_ceil(BLOCK) as u32, 1),
        block_dim: (BLOCK as u32, BLOCK as u32, 1),
        shared_mem_bytes: 0,
    }
}

impl CudaOpposed {
    pub fn new() -> Result<Self> {
        Self::load().map_err(|e| HighlightError::AcceleratorFailure(e.to_string()))
    }

    fn load() -> anyhow::Result<Self> {
        // Include compiled PTX from build.rs
        let ptx = include_str!(concat!(env!("OUT_DIR"), "/opposed_highlights.ptx"));

        let ctx = CudaContext::new(0)?;
        let stream = ctx.default_stream();
        let module = ctx.load_module(Ptx::from_src(ptx))?;

        Ok(Self {
            stream,
            init_mask: module.load_function("opposed_init_mask")?,
            dilate_mask: module.load_function("opposed_dilate_mask")?,
            chroma: module.load_function("opposed_chroma")?,
            reconstruct: module.load_function("opposed_reconstruct")?,
        })
    }

    /// Reconstructs `frame_in` into `frame_out` on the device. With `estimate`
    /// the mask and accumulation kernels run first and replace `chroma` when
    /// clipped photosites exist.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &self,
        frame_in: Frame<'_>,
        frame_out: FrameMut<'_>,
        cfa: &CfaPattern,
        thresholds: &ClipThresholds,
        chroma: [f32; 3],
        estimate: bool,
        power: f32,
    ) -> Result<DeviceRun> {
        self.run(frame_in, frame_out, cfa, thresholds, chroma, estimate, power)
            .map_err(|e| HighlightError::AcceleratorFailure(e.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        frame_in: Frame<'_>,
        frame_out: FrameMut<'_>,
        cfa: &CfaPattern,
        thresholds: &ClipThresholds,
        mut chroma: [f32; 3],
        estimate: bool,
        power: f32,
    ) -> anyhow::Result<DeviceRun> {
        let (roi_in, roi_out) = (frame_in.roi, frame_out.roi);
        let (filters, xtrans) = cfa.descriptor();
        let xtrans_flat: Vec<u8> = xtrans.iter().flatten().copied().collect();

        let width = roi_in.width as i32;
        let height = roi_in.height as i32;
        let roi_x = roi_in.x as i32;
        let roi_y = roi_in.y as i32;
        let [clip_r, clip_g, clip_b] = thresholds.clips;
        let [dark_r, dark_g, dark_b] = thresholds.dark;

        let d_in = self.stream.clone_htod(frame_in.data)?;
        let d_xtrans = self.stream.clone_htod(&xtrans_flat)?;
        let mut any_clipped = false;

        if estimate {
            let mstride = roi_in.width / 3 + 1;
            let mrows = roi_in.height / 3 + 1;
            let plane = (mstride * mrows).div_ceil(MASK_ALIGN) * MASK_ALIGN;
            let mwidth = (roi_in.width / 3) as i32;
            let mheight = (roi_in.height / 3) as i32;
            let (mstride_i, mrows_i, plane_i) = (mstride as i32, mrows as i32, plane as i32);

            let mut d_inmask = self.stream.alloc_zeros::<u8>(3 * plane)?;
            let mut d_outmask = self.stream.alloc_zeros::<u8>(3 * plane)?;
            let mut d_accu = self.stream.alloc_zeros::<f32>(8)?;

            let mut launch = self.stream.launch_builder(&self.init_mask);
            launch.arg(&d_in);
            launch.arg(&mut d_inmask);
            launch.arg(&mut d_accu);
            launch.arg(&width);
            launch.arg(&height);
            launch.arg(&plane_i);
            launch.arg(&mstride_i);
            launch.arg(&filters);
            launch.arg(&d_xtrans);
            launch.arg(&roi_x);
            launch.arg(&roi_y);
            launch.arg(&clip_r);
            launch.arg(&clip_g);
            launch.arg(&clip_b);
            unsafe { launch.launch(grid(roi_in.width, roi_in.height))? };

            let mut launch = self.stream.launch_builder(&self.dilate_mask);
            launch.arg(&d_inmask);
            launch.arg(&mut d_outmask);
            launch.arg(&mwidth);
            launch.arg(&mheight);
            launch.arg(&mstride_i);
            launch.arg(&mrows_i);
            launch.arg(&plane_i);
            unsafe { launch.launch(grid(mstride, mrows))? };

            let mut launch = self.stream.launch_builder(&self.chroma);
            launch.arg(&d_in);
            launch.arg(&d_outmask);
            launch.arg(&mut d_accu);
            launch.arg(&width);
            launch.arg(&height);
            launch.arg(&plane_i);
            launch.arg(&mstride_i);
            launch.arg(&mwidth);
            launch.arg(&mheight);
            launch.arg(&filters);
            launch.arg(&d_xtrans);
            launch.arg(&roi_x);
            launch.arg(&roi_y);
            launch.arg(&clip_r);
            launch.arg(&clip_g);
            launch.arg(&clip_b);
            launch.arg(&dark_r);
            launch.arg(&dark_g);
            launch.arg(&dark_b);
            launch.arg(&power);
            unsafe { launch.launch(grid(roi_in.width, roi_in.height))? };

            // [sum r, sum g, sum b, clipped flag, count r, count g, count b, unused]
            let accu = self.stream.clone_dtoh(&d_accu)?;
            debug!(?accu, "Device chrominance accumulators");
            if accu[3] > 0.0 {
                any_clipped = true;
                for c in 0..3 {
                    chroma[c] = accu[c] / accu[c + 4].max(1.0);
                }
            }
        }

        let mut d_out = self.stream.alloc_zeros::<f32>(frame_out.data.len())?;
        let out_width = roi_out.width as i32;
        let out_height = roi_out.height as i32;
        let out_x = roi_out.x as i32;
        let out_y = roi_out.y as i32;
        let [chroma_r, chroma_g, chroma_b] = chroma;

        let mut launch = self.stream.launch_builder(&self.reconstruct);
        launch.arg(&d_in);
        launch.arg(&mut d_out);
        launch.arg(&out_width);
        launch.arg(&out_height);
        launch.arg(&width);
        launch.arg(&height);
        launch.arg(&out_x);
        launch.arg(&out_y);
        launch.arg(&filters);
        launch.arg(&d_xtrans);
        launch.arg(&roi_x);
        launch.arg(&roi_y);
        launch.arg(&clip_r);
        launch.arg(&clip_g);
        launch.arg(&clip_b);
        launch.arg(&chroma_r);
        launch.arg(&chroma_g);
        launch.arg(&chroma_b);
        launch.arg(&power);
        unsafe { launch.launch(grid(roi_out.width, roi_out.height))? };

        let out = self.stream.clone_dtoh(&d_out)?;
        frame_out.data.copy_from_slice(&out);

        Ok(DeviceRun { chroma, any_clipped })
    }
}
