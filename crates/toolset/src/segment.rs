//! Screenshot segmentation.
//!
//! Tall captures are tiled into height-bounded horizontal bands so each
//! transported payload stays within a size bound. Consecutive bands share
//! `overlap` rows of content, letting a downstream viewer reconcile the
//! boundaries without loss. The policy of capping how many segments a tool
//! returns lives in the screenshot tools, not here.

use std::io::Cursor;

use browser_use_core::{Error, ImageMediaType, ImageSegment, Result};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

fn image_format(media_type: ImageMediaType) -> ImageFormat {
    match media_type {
        ImageMediaType::Png => ImageFormat::Png,
        ImageMediaType::Jpeg => ImageFormat::Jpeg,
        ImageMediaType::Webp => ImageFormat::WebP,
    }
}

/// Split an encoded image into bands of at most `max_height` rows, each band
/// after the first starting `overlap` rows above where the previous band
/// ended. An image that already fits returns a single segment whose bytes
/// are the source, unchanged. The final band is clipped, never padded.
pub fn segment_image(
    image_bytes: &[u8],
    max_height: u32,
    overlap: u32,
    media_type: ImageMediaType,
) -> Result<Vec<ImageSegment>> {
    if overlap >= max_height {
        return Err(Error::Config(format!(
            "overlap ({overlap}) must be smaller than max_height ({max_height})"
        )));
    }

    let img = image::load_from_memory_with_format(image_bytes, image_format(media_type))
        .map_err(|e| Error::Image(format!("Failed to decode image: {e}")))?;
    let (width, height) = (img.width(), img.height());
    if height == 0 || width == 0 {
        return Err(Error::Image("Image has no pixels".into()));
    }

    if height <= max_height {
        return Ok(vec![ImageSegment {
            data: image_bytes.to_vec(),
            media_type,
            ordinal: 0,
        }]);
    }

    let stride = max_height - overlap;
    let mut segments = Vec::new();
    let mut top = 0u32;
    loop {
        let band_height = max_height.min(height - top);
        let band = img.crop_imm(0, top, width, band_height);
        segments.push(ImageSegment {
            data: encode(&band, media_type)?,
            media_type,
            ordinal: segments.len(),
        });
        if top + band_height >= height {
            break;
        }
        top += stride;
    }

    debug!(
        height,
        max_height,
        overlap,
        count = segments.len(),
        "Segmented image"
    );
    Ok(segments)
}

fn encode(band: &DynamicImage, media_type: ImageMediaType) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    band.write_to(&mut buf, image_format(media_type))
        .map_err(|e| Error::Image(format!("Failed to encode segment: {e}")))?;
    Ok(buf.into_inner())
}
