//! # Image Loading and Decoding
//!
//! Loads the label logo from a file path, data URI, or raw base64 string and
//! prepares it for PDF embedding. JPEG images pass through without
//! re-encoding (PDF readers decode DCTDecode natively). PNG images are
//! decoded to RGB pixels with a separate alpha channel for SMask
//! transparency. Generated code rasters enter through [`LoadedImage::from_gray`].

use std::io::Cursor;
use std::path::Path;

use crate::error::{Result, TagError};

/// A fully decoded/loaded image ready for PDF embedding.
///
/// Equality and hashing cover the pixel data, which lets the PDF writer
/// embed an image drawn on many pages only once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl LoadedImage {
    /// Wrap an 8-bit grayscale raster (one byte per pixel, row-major).
    pub fn from_gray(width_px: u32, height_px: u32, gray: &[u8]) -> Self {
        let rgb = gray.iter().flat_map(|&g| [g, g, g]).collect();
        Self {
            pixel_data: ImagePixelData::Decoded { rgb, alpha: None },
            width_px,
            height_px,
        }
    }
}

/// Load an image from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` (data URI)
/// - File path (any existing file, or one starting with `/`, `./`, `../`)
/// - Raw base64-encoded image data
pub fn load_image(src: &str) -> Result<LoadedImage> {
    let raw_bytes = read_source_bytes(src)?;
    decode_image_bytes(&raw_bytes)
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>> {
    if let Some(rest) = src.strip_prefix("data:image/") {
        let (_, b64) = rest
            .split_once(',')
            .ok_or_else(|| TagError::Image("Invalid data URI: missing comma".to_string()))?;
        return base64_decode(b64);
    }

    let read_file = || {
        std::fs::read(src)
            .map_err(|e| TagError::Image(format!("Failed to read image file '{}': {}", src, e)))
    };

    if src.starts_with("./") || src.starts_with("../") || Path::new(src).is_file() {
        return read_file();
    }

    // Base64 may itself start with '/' (every JPEG does), so an absolute
    // path that doesn't exist is only reported once base64 has failed too.
    base64_decode(src).or_else(|e| if src.starts_with('/') { read_file() } else { Err(e) })
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| TagError::Image(format!("Base64 decode error: {}", e)))
}

/// Raster formats accepted for a logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogoFormat {
    Jpeg,
    Png,
}

/// Identify the format from its magic bytes.
fn sniff_format(data: &[u8]) -> Option<LogoFormat> {
    match data {
        [0xFF, 0xD8, ..] => Some(LogoFormat::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(LogoFormat::Png),
        _ => None,
    }
}

fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage> {
    if data.len() < 4 {
        return Err(TagError::Image("Image data too short".to_string()));
    }
    match sniff_format(data) {
        Some(LogoFormat::Jpeg) => decode_jpeg(data),
        Some(LogoFormat::Png) => decode_png(data),
        None => Err(TagError::Image(
            "Unsupported image format (expected JPEG or PNG)".to_string(),
        )),
    }
}

fn reader(data: &[u8]) -> Result<image::io::Reader<Cursor<&[u8]>>> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TagError::Image(format!("format detection error: {}", e)))
}

/// JPEG bytes go into the PDF untouched (DCTDecode); only the header is read.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage> {
    let (width_px, height_px) = reader(data)?
        .into_dimensions()
        .map_err(|e| TagError::Image(format!("Failed to read JPEG dimensions: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: jpeg_color_space(data),
        },
        width_px,
        height_px,
    })
}

/// Component count from the first SOF segment: 1 is gray, anything else RGB.
fn jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // past SOI
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof {
            // length(2) precision(1) height(2) width(2) components(1)
            return match data.get(i + 9) {
                Some(1) => JpegColorSpace::DeviceGray,
                _ => JpegColorSpace::DeviceRGB,
            };
        }
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + seg_len;
    }
    JpegColorSpace::DeviceRGB
}

/// PNG: decode to RGBA, then split colour from alpha. Alpha is dropped
/// when every pixel is opaque so no SMask gets written.
fn decode_png(data: &[u8]) -> Result<LoadedImage> {
    let rgba = reader(data)?
        .decode()
        .map_err(|e| TagError::Image(format!("Failed to decode PNG: {}", e)))?
        .to_rgba8();
    let (width_px, height_px) = rgba.dimensions();

    let (rgb, alpha): (Vec<[u8; 3]>, Vec<u8>) = rgba
        .pixels()
        .map(|p| ([p[0], p[1], p[2]], p[3]))
        .unzip();
    let opaque = alpha.iter().all(|&a| a == 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb: rgb.into_iter().flatten().collect(),
            alpha: (!opaque).then_some(alpha),
        },
        width_px,
        height_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn png_bytes(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(LogoFormat::Jpeg));
        assert_eq!(sniff_format(&[0x89, 0x50, 0x4E, 0x47]), Some(LogoFormat::Png));
        assert_eq!(sniff_format(b"GIF8"), None);
        assert_eq!(sniff_format(&[0xFF]), None);
    }

    #[test]
    fn test_from_gray_expands_to_rgb() {
        let img = LoadedImage::from_gray(2, 1, &[0, 255]);
        match img.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
                assert!(alpha.is_none());
            }
            _ => panic!("gray raster should be Decoded"),
        }
    }

    #[test]
    fn test_missing_file_is_image_error() {
        let result = load_image("./definitely/not/here/logo.png");
        assert!(matches!(result, Err(TagError::Image(_))));
    }

    #[test]
    fn test_png_logo_on_disk() {
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgba([1, 2, 3, 255]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, png_bytes(&img)).unwrap();

        let loaded = load_image(path.to_str().unwrap()).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (3, 2));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(load_image("data:image/png;base64").is_err());
        assert!(decode_image_bytes(&[0x00, 0x01]).is_err());
        assert!(decode_image_bytes(b"GIF89a").is_err());
    }

    #[test]
    fn test_png_alpha_kept_only_when_transparent() {
        let opaque = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        match decode_image_bytes(&png_bytes(&opaque)).unwrap().pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, vec![255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }

        let faded = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 128]));
        match decode_image_bytes(&png_bytes(&faded)).unwrap().pixel_data {
            ImagePixelData::Decoded { alpha, .. } => assert_eq!(alpha, Some(vec![128])),
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert_eq!(data, &buf);
                assert!(matches!(color_space, JpegColorSpace::DeviceRGB));
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_data_uri_and_raw_base64() {
        let png = png_bytes(&image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 255, 0, 255])));
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);

        let from_uri = load_image(&format!("data:image/png;base64,{}", b64)).unwrap();
        assert_eq!(from_uri.width_px, 1);

        let from_raw = load_image(&format!("  {}\n", b64)).unwrap();
        assert_eq!(from_raw.height_px, 1);
    }
}
