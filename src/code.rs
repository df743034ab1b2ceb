//! # Code Images
//!
//! Turns a payload string into a raster QR symbol ready to place on a label.
//!
//! The generator sits behind [`CodeGenerator`] so layout can be driven with
//! a stub in tests and so a failed encode is just an `Err` the layout engine
//! can swallow.

use qrcode::{Color, EcLevel, QrCode};

use crate::error::{Result, TagError};
use crate::image_loader::LoadedImage;
use crate::model::{CodeOptions, ErrorCorrection};

/// Produces the image placed in a label's code region.
pub trait CodeGenerator {
    fn generate(&self, data: &str, options: &CodeOptions) -> Result<LoadedImage>;
}

/// QR codes via the `qrcode` crate, rasterized to 8-bit grayscale.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeGenerator;

impl QrCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::L => EcLevel::L,
        ErrorCorrection::M => EcLevel::M,
        ErrorCorrection::Q => EcLevel::Q,
        ErrorCorrection::H => EcLevel::H,
    }
}

impl CodeGenerator for QrCodeGenerator {
    fn generate(&self, data: &str, options: &CodeOptions) -> Result<LoadedImage> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), ec_level(options.error_correction))
            .map_err(|e| TagError::Code(format!("QR encoding failed: {}", e)))?;

        let modules = code.width();
        let colors = code.to_colors();
        let scale = options.scale.max(1) as usize;
        let quiet = options.margin as usize;
        let (side, area) = raster_size(modules, quiet, scale).ok_or_else(|| {
            TagError::Code(format!(
                "raster too large: {} modules, margin {}, scale {}",
                modules, options.margin, options.scale
            ))
        })?;

        let mut gray = vec![255u8; area];
        for (idx, color) in colors.iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let (mx, my) = (idx % modules, idx / modules);
            let x0 = (mx + quiet) * scale;
            let y0 = (my + quiet) * scale;
            for y in y0..y0 + scale {
                let row = y * side;
                gray[row + x0..row + x0 + scale].fill(0);
            }
        }

        Ok(LoadedImage::from_gray(side as u32, side as u32, &gray))
    }
}

/// Side length and pixel count of the raster, or `None` when the side
/// overflows `u32` or the RGB buffer size overflows `usize`.
fn raster_size(modules: usize, quiet: usize, scale: usize) -> Option<(usize, usize)> {
    let side = quiet
        .checked_mul(2)?
        .checked_add(modules)?
        .checked_mul(scale)?;
    u32::try_from(side).ok()?;
    let area = side.checked_mul(side)?;
    area.checked_mul(3)?;
    Some((side, area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImagePixelData;

    fn pixels(img: &LoadedImage) -> &[u8] {
        match &img.pixel_data {
            ImagePixelData::Decoded { rgb, .. } => rgb,
            _ => panic!("QR raster should be Decoded"),
        }
    }

    #[test]
    fn test_scale_and_margin_set_raster_size() {
        let gen = QrCodeGenerator::new();
        let plain = gen
            .generate("https://x.test/tag?d=1", &CodeOptions { margin: 0, scale: 1, ..Default::default() })
            .unwrap();
        let modules = plain.width_px;
        assert!(modules >= 21);

        let scaled = gen
            .generate("https://x.test/tag?d=1", &CodeOptions { margin: 4, scale: 3, ..Default::default() })
            .unwrap();
        assert_eq!(scaled.width_px, (modules + 8) * 3);
        assert_eq!(scaled.width_px, scaled.height_px);
        assert_eq!(pixels(&scaled).len(), (scaled.width_px * scaled.height_px * 3) as usize);
    }

    #[test]
    fn test_finder_pattern_corner_is_dark_without_margin() {
        let img = QrCodeGenerator::new()
            .generate("hello", &CodeOptions::default())
            .unwrap();
        assert_eq!(&pixels(&img)[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let img = QrCodeGenerator::new()
            .generate("hello", &CodeOptions { margin: 2, ..Default::default() })
            .unwrap();
        assert_eq!(&pixels(&img)[..3], &[255, 255, 255]);
    }

    #[test]
    fn test_oversized_payload_is_an_error() {
        let huge = "x".repeat(8000);
        let result = QrCodeGenerator::new().generate(&huge, &CodeOptions::default());
        assert!(matches!(result, Err(TagError::Code(_))));
    }

    #[test]
    fn test_unrepresentable_raster_is_an_error() {
        let huge = CodeOptions { scale: u32::MAX, margin: u32::MAX, ..Default::default() };
        let result = QrCodeGenerator::new().generate("hello", &huge);
        assert!(matches!(result, Err(TagError::Code(_))));
        assert_eq!(raster_size(21, 0, 1), Some((21, 441)));
        assert_eq!(raster_size(usize::MAX, 1, 1), None);
    }

    #[test]
    fn test_higher_error_correction_needs_more_modules() {
        let gen = QrCodeGenerator::new();
        let data = "https://your-vercel.app/tag?d=%7B%22page%22%3A1%2C%22data%22%3A%7B%22SKU%22%3A%22ABC123%22%7D%7D";
        let opts = |ec| CodeOptions { error_correction: ec, margin: 0, scale: 1 };
        let low = gen.generate(data, &opts(ErrorCorrection::L)).unwrap();
        let high = gen.generate(data, &opts(ErrorCorrection::H)).unwrap();
        assert!(high.width_px > low.width_px);
    }
}
