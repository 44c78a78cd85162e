// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image decode/encode and the binary-to-text encoding of response payloads.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageBuffer, ImageDecoder, ImageReader, Limits, RgbImage};

use crate::error::{AnnotatorError, Result};

/// JPEG start-of-image marker.
const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

/// Upper bound on the decoded pixel buffer, in bytes.
///
/// Matches the default allocation limit of [`image::Limits`], so both decode paths
/// refuse the same oversized frames.
pub const MAX_DECODED_BYTES: u64 = 512 * 1024 * 1024;

/// Decode encoded image bytes into a color image.
///
/// JPEG input goes through `jpeg-decoder` first to sidestep stride issues in the
/// default decoder; anything else (and any JPEG it cannot handle) falls back to
/// format sniffing in `image`. The EXIF orientation, when present, is applied to
/// the result.
///
/// # Errors
///
/// Returns [`AnnotatorError::Decode`] when the payload is empty, is not a
/// decodable image, or would decode to more than [`MAX_DECODED_BYTES`].
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(AnnotatorError::Decode("empty image payload".to_string()));
    }

    if bytes.starts_with(&JPEG_MAGIC) {
        if let Some(img) = decode_jpeg(bytes) {
            return Ok(img);
        }
    }

    decode_with_limits(bytes).map_err(|e| AnnotatorError::Decode(e.to_string()))
}

fn decode_jpeg(bytes: &[u8]) -> Option<DynamicImage> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    decoder.read_info().ok()?;
    let info = decoder.info()?;
    let channels: u64 = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => 3,
        jpeg_decoder::PixelFormat::L8 => 1,
        _ => return None,
    };
    let decoded_len = u64::from(info.width) * u64::from(info.height) * channels;
    if decoded_len > MAX_DECODED_BYTES {
        return None;
    }

    let pixels = decoder.decode().ok()?;
    let (width, height) = (u32::from(info.width), u32::from(info.height));
    let mut img = if channels == 3 {
        ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)?
    } else {
        ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)?
    };

    if let Some(orientation) = decoder.exif_data().and_then(Orientation::from_exif_chunk) {
        img.apply_orientation(orientation);
    }
    Some(img)
}

fn decode_with_limits(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_DECODED_BYTES);

    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits);
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Encode an RGB image as JPEG.
///
/// # Errors
///
/// Returns [`AnnotatorError::Encode`] if the encoder rejects the image.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(image.as_raw().len() / 4);
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| AnnotatorError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// How image bytes are embedded in a JSON string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImageEncoding {
    /// Standard padded base64.
    #[default]
    Base64,
    /// One character per byte, with code point equal to the byte value.
    Latin1,
}

impl ImageEncoding {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Latin1 => "latin1",
        }
    }

    /// Encode bytes as text.
    #[must_use]
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => STANDARD.encode(bytes),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Decode text produced by [`ImageEncoding::encode`] back into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::Decode`] for invalid base64 or characters above U+00FF.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => STANDARD
                .decode(text)
                .map_err(|e| AnnotatorError::Decode(format!("invalid base64 payload: {e}"))),
            Self::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        AnnotatorError::Decode(format!("character {c:?} is outside latin1"))
                    })
                })
                .collect(),
        }
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base64" | "b64" => Ok(Self::Base64),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Self::Latin1),
            _ => Err(format!("invalid image encoding '{s}', expected base64 or latin1")),
        }
    }
}
