//! Frame geometry types

use crate::highlights::common::error::{HighlightError, Result};

/// Region of interest of a frame relative to the full-resolution source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Horizontal offset in photosites
    pub x: usize,
    /// Vertical offset in photosites
    pub y: usize,
    /// Width in photosites
    pub width: usize,
    /// Height in photosites
    pub height: usize,
    /// Scale of this region relative to the full-resolution source
    pub scale: f32,
}

impl Roi {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            scale: 1.0,
        }
    }

    pub fn with_offset(mut self, x: usize, y: usize) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn photosites(&self) -> usize {
        self.width * self.height
    }

    /// Checks that a buffer holds exactly `stride` floats for every photosite.
    pub fn check_buffer(&self, len: usize, stride: usize) -> Result<()> {
        let expected = self.photosites() * stride;
        if len != expected {
            return Err(HighlightError::BufferSizeMismatch { expected, got: len });
        }
        Ok(())
    }
}

/// Read-only frame: photosite data plus its region of interest
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub data: &'a [f32],
    pub roi: Roi,
}

/// Writable frame: photosite data plus its region of interest
#[derive(Debug)]
pub struct FrameMut<'a> {
    pub data: &'a mut [f32],
    pub roi: Roi,
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [f32], roi: Roi) -> Self {
        Self { data, roi }
    }
}

impl<'a> FrameMut<'a> {
    pub fn new(data: &'a mut [f32], roi: Roi) -> Self {
        Self { data, roi }
    }
}
