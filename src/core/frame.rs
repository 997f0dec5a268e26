// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion of external frame buffers into images for the estimator.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::FrameError;
use crate::misc::type_aliases::Float;

/// Number of interleaved channels of a frame.
pub const CHANNELS: usize = 3;

/// Borrowed view of an external 8 bits, 3 channels image.
///
/// Pixels are row major with interleaved channels.
/// Consecutive rows start `row_stride` bytes apart.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuffer<'a> {
    data: &'a [u8],
    height: usize,
    width: usize,
    row_stride: usize,
}

impl<'a> FrameBuffer<'a> {
    /// Check the declared geometry against the buffer.
    pub fn new(
        data: &'a [u8],
        height: usize,
        width: usize,
        channels: usize,
        row_stride: usize,
    ) -> Result<Self, FrameError> {
        if channels != CHANNELS {
            return Err(FrameError::Channels(channels));
        }
        if height > u32::MAX as usize || width > u32::MAX as usize {
            return Err(FrameError::TooLarge { height, width });
        }
        let row_len = width
            .checked_mul(CHANNELS)
            .ok_or(FrameError::TooLarge { height, width })?;
        if row_stride < row_len {
            return Err(FrameError::Stride {
                stride: row_stride,
                min: row_len,
            });
        }
        let expected = if height == 0 || width == 0 {
            0
        } else {
            (height - 1)
                .checked_mul(row_stride)
                .and_then(|n| n.checked_add(row_len))
                .ok_or(FrameError::TooLarge { height, width })?
        };
        if data.len() < expected {
            return Err(FrameError::Length {
                len: data.len(),
                expected,
            });
        }
        Ok(FrameBuffer {
            data,
            height,
            width,
            row_stride,
        })
    }

    /// Buffer without padding between rows.
    pub fn packed(data: &'a [u8], height: usize, width: usize) -> Result<Self, FrameError> {
        Self::new(data, height, width, CHANNELS, width.saturating_mul(CHANNELS))
    }

    /// View of an already decoded image.
    pub fn from_image(img: &'a RgbImage) -> Self {
        let (width, height) = img.dimensions();
        FrameBuffer {
            data: img.as_raw(),
            height: height as usize,
            width: width as usize,
            row_stride: width as usize * CHANNELS,
        }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes between the starts of two consecutive rows.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Pixel rows, without their padding.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> {
        let data = self.data;
        let stride = self.row_stride;
        let row_len = self.width * CHANNELS;
        // Zero-width frames carry no bytes, whatever their stride.
        let height = if row_len == 0 { 0 } else { self.height };
        (0..height).map(move |y| &data[y * stride..y * stride + row_len])
    }

    /// Copy into a packed `RgbImage`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_image(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width as u32, self.height as u32);
        let row_len = self.width * CHANNELS;
        if row_len > 0 {
            for (dst, src) in img.chunks_exact_mut(row_len).zip(self.rows()) {
                dst.copy_from_slice(src);
            }
        }
        img
    }
}

/// Dimensions `(height, width)` of a frame after scaling.
///
/// Each dimension is truncated towards zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_dimensions(height: usize, width: usize, scale: Float) -> (u32, u32) {
    (
        (height as Float * scale) as u32,
        (width as Float * scale) as u32,
    )
}

/// Image handed over to the estimator for a frame.
///
/// A scale of exactly 1.0 copies the pixels unchanged,
/// any other scale resamples with a bilinear filter.
#[allow(clippy::float_cmp)]
pub fn prepare(frame: &FrameBuffer, scale: Float) -> RgbImage {
    let img = frame.to_image();
    if scale == 1.0 {
        img
    } else {
        let (height, width) = scaled_dimensions(frame.height(), frame.width(), scale);
        imageops::resize(&img, width, height, FilterType::Triangle)
    }
}

// TESTS #############################################################
