// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for pose inference.
//!
//! Letterbox resizing (aspect-preserving resize onto a padded canvas), normalization
//! to [0, 1] and conversion into the tensor layout the model expects, plus the
//! inverse mapping from model space back to the original image.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Letterbox padding color used by YOLO models (gray).
pub const YOLO_PAD_VALUE: u8 = 114;

/// Letterbox padding color used by BlazePose models (black).
pub const BLAZEPOSE_PAD_VALUE: u8 = 0;

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Memory layout of the model input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[batch, channels, height, width]` (YOLO exports).
    Nchw,
    /// `[batch, height, width, channels]` (TFLite conversions such as BlazePose).
    Nhwc,
}

impl TensorLayout {
    /// Infer the layout from a rank-4 input shape; dynamic dims are negative.
    ///
    /// Returns the layout and the static (height, width) if both are known.
    #[must_use]
    pub fn from_shape(shape: &[i64]) -> Option<(Self, Option<(usize, usize)>)> {
        if shape.len() != 4 {
            return None;
        }
        let hw = |h: i64, w: i64| match (usize::try_from(h), usize::try_from(w)) {
            (Ok(h), Ok(w)) if h > 0 && w > 0 => Some((h, w)),
            _ => None,
        };
        if shape[3] == 3 {
            Some((Self::Nhwc, hw(shape[1], shape[2])))
        } else if shape[1] == 3 {
            Some((Self::Nchw, hw(shape[2], shape[3])))
        } else {
            None
        }
    }

    /// Shape of a single-image tensor of the given size.
    #[must_use]
    pub const fn tensor_shape(&self, size: (usize, usize)) -> (usize, usize, usize, usize) {
        match self {
            Self::Nchw => (1, 3, size.0, size.1),
            Self::Nhwc => (1, size.0, size.1, 3),
        }
    }
}

/// Result of preprocessing an image, containing the tensor and transform info.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Preprocessed image tensor, normalized to [0, 1].
    pub tensor: Array4<f32>,
    /// Original image dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Model input dimensions (height, width).
    pub input_shape: (usize, usize),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

impl PreprocessResult {
    /// Map a point from model input space back to original image pixels.
    #[must_use]
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        scale_point(x, y, self.scale, self.padding)
    }

    /// Map a point from model input space to coordinates normalized by the
    /// original image size.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_normalized(&self, x: f32, y: f32) -> (f32, f32) {
        let (ox, oy) = self.to_original(x, y);
        let (h, w) = (self.orig_shape.0 as f32, self.orig_shape.1 as f32);
        (ox / w, oy / h)
    }

    /// Normalize a depth value expressed in model input pixels so it shares the
    /// scale of the normalized x coordinate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize_depth(&self, z: f32) -> f32 {
        z / self.scale.1 / self.orig_shape.1 as f32
    }
}

/// Preprocess an image for pose inference.
///
/// # Arguments
///
/// * `image` - Input image.
/// * `target_size` - Target size as (height, width).
/// * `layout` - Tensor layout expected by the model.
/// * `pad_value` - Gray level of the letterbox padding.
///
/// # Returns
///
/// Preprocessed tensor and transform information for post-processing.
#[must_use]
pub fn preprocess_image(
    image: &DynamicImage,
    target_size: (usize, usize),
    layout: TensorLayout,
    pad_value: u8,
) -> PreprocessResult {
    let (orig_width, orig_height) = image.dimensions();
    let (new_width, new_height, pad_left, pad_top, scale) =
        calculate_letterbox_params(orig_width, orig_height, target_size);

    let resized = imageops::resize(&image.to_rgb8(), new_width, new_height, FilterType::Triangle);

    let (dst_h, dst_w) = target_size;
    let pad = f32::from(pad_value) * INV_255;
    let mut tensor = Array4::from_elem(layout.tensor_shape(target_size), pad);

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (ty, tx) = ((y + pad_top) as usize, (x + pad_left) as usize);
        if ty >= dst_h || tx >= dst_w {
            continue;
        }
        for c in 0..3 {
            let value = f32::from(pixel[c]) * INV_255;
            match layout {
                TensorLayout::Nchw => tensor[[0, c, ty, tx]] = value,
                TensorLayout::Nhwc => tensor[[0, ty, tx, c]] = value,
            }
        }
    }

    PreprocessResult {
        tensor,
        orig_shape: (orig_height, orig_width),
        input_shape: target_size,
        scale,
        #[allow(clippy::cast_precision_loss)]
        padding: (pad_top as f32, pad_left as f32),
    }
}

/// Calculate letterbox parameters for resizing.
///
/// Computes new dimensions and padding to fit the image within the target size
/// while maintaining aspect ratio. Padding is split evenly on both sides.
///
/// # Returns
///
/// `(new_width, new_height, pad_left, pad_top, (scale_y, scale_x))`.
fn calculate_letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target_size: (usize, usize),
) -> (u32, u32, u32, u32, (f32, f32)) {
    #[allow(clippy::cast_precision_loss)]
    let (target_h, target_w) = (target_size.0 as f32, target_size.1 as f32);
    #[allow(clippy::cast_precision_loss)]
    let (orig_h, orig_w) = (orig_height.max(1) as f32, orig_width.max(1) as f32);

    let scale = (target_h / orig_h).min(target_w / orig_w);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_w = ((orig_w * scale).round() as u32).max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_h = ((orig_h * scale).round() as u32).max(1);

    #[allow(clippy::cast_possible_truncation)]
    let pad_w = (target_size.1 as u32).saturating_sub(new_w);
    #[allow(clippy::cast_possible_truncation)]
    let pad_h = (target_size.0 as u32).saturating_sub(new_h);

    let pad_left = pad_w / 2;
    let pad_top = pad_h / 2;

    #[allow(clippy::cast_precision_loss)]
    let scale_x = new_w as f32 / orig_w;
    #[allow(clippy::cast_precision_loss)]
    let scale_y = new_h as f32 / orig_h;

    (new_w, new_h, pad_left, pad_top, (scale_y, scale_x))
}

/// Scale a point from model space back to original image space.
///
/// # Arguments
///
/// * `scale` - Scale factors (`scale_y`, `scale_x`) from preprocessing.
/// * `padding` - Padding (`pad_top`, `pad_left`) from preprocessing.
#[must_use]
pub fn scale_point(x: f32, y: f32, scale: (f32, f32), padding: (f32, f32)) -> (f32, f32) {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;
    ((x - pad_left) / scale_x, (y - pad_top) / scale_y)
}
