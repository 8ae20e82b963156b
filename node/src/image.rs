//! Image ingestion: host tensor batches to inline PNG data URLs.

use std::io::Cursor;

use base64::Engine as _;
use image::RgbImage;

use crate::error::{NodeError, Result};

/// A batch of H×W×C float images with channel values in [0, 1], as handed
/// over by the node-graph host. Only the first element of a batch is used.
#[derive(Debug, Clone)]
pub struct ImageBatch {
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
}

impl ImageBatch {
    /// Wrap a flat row-major (batch, height, width, channel) buffer.
    pub fn new(
        data: Vec<f32>,
        batch: usize,
        height: usize,
        width: usize,
        channels: usize,
    ) -> Result<Self> {
        if batch == 0 || height == 0 || width == 0 {
            return Err(NodeError::InvalidInput(format!(
                "Empty image batch: shape ({}, {}, {}, {})",
                batch, height, width, channels
            )));
        }
        if channels != 3 {
            return Err(NodeError::InvalidInput(format!(
                "Expected 3 image channels, got {}",
                channels
            )));
        }
        let expected = batch * height * width * channels;
        if data.len() != expected {
            return Err(NodeError::InvalidInput(format!(
                "Image buffer holds {} values, shape needs {}",
                data.len(),
                expected
            )));
        }

        Ok(Self {
            data,
            height,
            width,
            channels,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// First batch element as 8-bit RGB, values clamped to [0, 1].
    fn first_frame_rgb8(&self) -> Result<RgbImage> {
        let frame_len = self.height * self.width * self.channels;
        let pixels: Vec<u8> = self.data[..frame_len]
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect();

        RgbImage::from_vec(self.width as u32, self.height as u32, pixels)
            .ok_or_else(|| NodeError::Image("Pixel buffer does not match shape".to_string()))
    }

    /// Encode the first frame as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let frame = self.first_frame_rgb8()?;
        let mut buffer = Cursor::new(Vec::new());
        frame
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| NodeError::Image(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer.into_inner())
    }

    /// Encode the first frame as a `data:image/png;base64,...` URL for
    /// embedding in a chat message.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_png()?;
        let payload = base64::engine::general_purpose::STANDARD.encode(png);
        Ok(format!("data:image/png;base64,{}", payload))
    }
}
