//! Image XObjects for the signature stamp.
//!
//! JPEG data is embedded as-is with `/DCTDecode`. PNG and generated
//! images are stored as Flate-compressed samples, with any alpha channel
//! split into a `/SMask` image.

use crate::decoders::flate_encode;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use bytes::Bytes;
use image::{GenericImageView, Rgba, RgbaImage};

/// Color space of the embedded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// One component per pixel
    DeviceGray,
    /// Three components per pixel
    DeviceRGB,
    /// Four components per pixel
    DeviceCMYK,
}

impl ColorSpace {
    /// PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// Image ready to be written as an Image XObject.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color space of `data`
    pub color_space: ColorSpace,
    /// `DCTDecode` or `FlateDecode`
    pub filter: &'static str,
    /// Encoded sample data
    pub data: Vec<u8>,
    /// Flate-compressed alpha channel, if any
    pub soft_mask: Option<Vec<u8>>,
}

impl ImageData {
    /// Load an image, detecting JPEG or PNG from its magic bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.starts_with(&[0xFF, 0xD8]) {
            return Self::from_jpeg(data.to_vec());
        }
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
                .map_err(|e| Error::Image(format!("failed to decode PNG: {}", e)))?;
            return Self::from_rgba(&img.to_rgba8());
        }
        Err(Error::Image("unsupported image format, expected PNG or JPEG".to_string()))
    }

    /// Load an image file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Wrap JPEG data for pass-through embedding.
    pub fn from_jpeg(data: Vec<u8>) -> Result<Self> {
        let img = image::load_from_memory_with_format(&data, image::ImageFormat::Jpeg)
            .map_err(|e| Error::Image(format!("failed to decode JPEG: {}", e)))?;
        let (width, height) = img.dimensions();
        let color_space = match img.color().channel_count() {
            1 => ColorSpace::DeviceGray,
            4 => ColorSpace::DeviceCMYK,
            _ => ColorSpace::DeviceRGB,
        };
        Ok(Self {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data,
            soft_mask: None,
        })
    }

    /// Compress RGBA pixels; the alpha channel is kept only if some pixel
    /// is not fully opaque.
    pub fn from_rgba(img: &RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        let pixel_count = (width * height) as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in img.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let soft_mask = if alpha.iter().any(|&a| a != 0xFF) {
            Some(flate_encode(&alpha)?)
        } else {
            None
        };
        Ok(Self {
            width,
            height,
            color_space: ColorSpace::DeviceRGB,
            filter: "FlateDecode",
            data: flate_encode(&rgb)?,
            soft_mask,
        })
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Image XObject stream, pointing at `soft_mask` when given.
    pub fn xobject(&self, soft_mask: Option<ObjectRef>) -> Object {
        let mut dict = self.base_dict(self.color_space);
        dict.insert("Filter".into(), Object::Name(self.filter.to_string()));
        if let Some(mask) = soft_mask {
            dict.insert("SMask".into(), Object::Reference(mask));
        }
        Object::Stream {
            dict,
            data: Bytes::from(self.data.clone()),
        }
    }

    /// Gray soft-mask stream for the alpha channel.
    pub fn soft_mask_xobject(&self) -> Option<Object> {
        self.soft_mask.as_ref().map(|mask| {
            let mut dict = self.base_dict(ColorSpace::DeviceGray);
            dict.insert("Filter".into(), Object::Name("FlateDecode".into()));
            Object::Stream {
                dict,
                data: Bytes::from(mask.clone()),
            }
        })
    }

    fn base_dict(&self, color_space: ColorSpace) -> Dict {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("XObject".into()));
        dict.insert("Subtype".into(), Object::Name("Image".into()));
        dict.insert("Width".into(), Object::Integer(self.width as i64));
        dict.insert("Height".into(), Object::Integer(self.height as i64));
        dict.insert("ColorSpace".into(), Object::Name(color_space.pdf_name().into()));
        dict.insert("BitsPerComponent".into(), Object::Integer(8));
        dict
    }
}

/// Built-in seal used when no stamp image is configured: a navy ring
/// around a lighter disc on a transparent background.
pub fn default_stamp() -> RgbaImage {
    const SIZE: u32 = 96;
    let center = (SIZE as f64 - 1.0) / 2.0;
    RgbaImage::from_fn(SIZE, SIZE, |x, y| {
        let dx = x as f64 - center;
        let dy = y as f64 - center;
        let r = (dx * dx + dy * dy).sqrt();
        if r > 47.0 {
            Rgba([0, 0, 0, 0])
        } else if r > 40.0 || (r > 30.0 && r <= 33.0) {
            Rgba([0x1F, 0x3A, 0x68, 0xFF])
        } else {
            Rgba([0xD6, 0xE0, 0xF0, 0xFF])
        }
    })
}
