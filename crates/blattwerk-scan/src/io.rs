// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image file helpers. Codec failures surface as `BlattwerkError::ImageError`
// carrying the offending path.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, info, instrument};

/// Load and decode an image file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| {
        BlattwerkError::ImageError(format!("failed to open {}: {}", path.display(), err))
    })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    Ok(img)
}

/// Decode an in-memory image (PNG, JPEG, ...).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| BlattwerkError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(
        width = img.width(),
        height = img.height(),
        "Image decoded from bytes"
    );
    Ok(img)
}

/// Write `image` to `path`; the format follows the file extension and falls
/// back to PNG when there is none.
#[instrument(skip(image), fields(path = %path.as_ref().display()))]
pub fn save_image(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    image.save_with_format(path, format).map_err(|err| {
        BlattwerkError::ImageError(format!("failed to save {}: {}", path.display(), err))
    })?;
    debug!(?format, "Image saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sheet.png");
        let img = RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]));

        save_image(&img, &path).expect("save");
        let loaded = load_image(&path).expect("load");
        assert_eq!(loaded.to_rgb8(), img);
    }

    #[test]
    fn decode_from_bytes() {
        let img = RgbImage::from_pixel(3, 3, Rgb([200, 100, 50]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).expect("encode");
        let decoded = decode_image(bytes.get_ref()).expect("decode");
        assert_eq!(decoded.to_rgb8(), img);
    }

    #[test]
    fn garbage_is_an_image_error() {
        let err = decode_image(b"definitely not a png").unwrap_err();
        assert_eq!(err.kind(), "image_error");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_image("/nonexistent/blattwerk/photo.jpg").unwrap_err();
        assert!(err.to_string().contains("photo.jpg"));
    }
}
