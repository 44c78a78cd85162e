// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Annotator
//!
//! HTTP service and library that runs a single-person pose model over an image,
//! reports the body landmarks and whether all of them are visible, and returns
//! the image with the skeleton drawn on it.
//!
//! ## Features
//!
//! - **ONNX Runtime** - Any BlazePose (33 landmarks) or YOLO pose (17 COCO keypoints) export
//! - **One endpoint** - `POST /process_image` with a multipart `image` and `seen_all_keypoints`
//! - **Visibility overlay** - Green skeleton when every landmark is visible, white otherwise
//! - **Multiple Backends** - CPU, CUDA, `CoreML` and `DirectML` via Cargo features
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_annotator::{PoseConfig, PoseModel, process_image};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PoseConfig::default();
//!     let mut model = PoseModel::load_with_config("pose_landmark_full.onnx", config.clone())?;
//!
//!     let bytes = std::fs::read("person.jpg")?;
//!     let processed = process_image(&mut model, &bytes, false, &config)?;
//!
//!     println!(
//!         "{} landmarks, all visible: {}",
//!         processed.keypoints.len(),
//!         processed.all_keypoints_visible
//!     );
//!     std::fs::write("annotated.jpg", &processed.jpeg)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Server
//!
//! ```bash
//! pose-annotator serve --model pose_landmark_full.onnx --port 5000
//!
//! curl -F image=@person.jpg -F seen_all_keypoints=false \
//!     http://localhost:5000/process_image
//! ```
//!
//! Response:
//!
//! ```json
//! {
//!   "image": "/9j/4AAQSkZJRg...",
//!   "keypoints": [{"x": 0.51, "y": 0.18, "z": -0.32, "visibility": 0.99}],
//!   "all_keypoints_visible": true
//! }
//! ```
//!
//! Any processing failure returns `500 {"detail": "..."}`; a missing `image`
//! field or malformed `seen_all_keypoints` returns `422`, and a body over the
//! configured limit returns `413`.
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`model`] | [`PoseEstimator`] trait and the ONNX [`PoseModel`] |
//! | [`pipeline`] | [`process_image`]: decode, estimate, draw, encode |
//! | [`annotate`] | [`DrawPolicy`] and the skeleton renderer |
//! | [`results`] | [`Landmark`] and [`Pose`] |
//! | [`format`] | [`PoseFormat`]: landmark names and skeleton topology |
//! | [`inference`] | [`PoseConfig`] for thresholds, device and output encoding |
//! | [`io`] | Image decode/encode and [`ImageEncoding`] |
//! | [`preprocessing`] | Letterbox and tensor layout |
//! | [`postprocessing`] | BlazePose and YOLO pose output decoding |
//! | [`metadata`] | ONNX model metadata parsing |
//! | [`error`] | Error types ([`AnnotatorError`], [`Result`]) |
//! | `server` | axum router and OpenAPI doc (feature `server`) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `server` | HTTP server and `serve` command (default) |
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `coreml` | Apple `CoreML` (macOS/iOS) |
//! | `directml` | `DirectML` (Windows) |

// Modules
pub mod annotate;
pub mod cli;
pub mod device;
pub mod error;
pub mod format;
pub mod inference;
pub mod io;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;
#[cfg(feature = "server")]
pub mod server;
pub mod visualizer;

// Re-export main types for convenience
pub use annotate::{DrawPolicy, DrawingSpec};
pub use device::Device;
pub use error::{AnnotatorError, Result};
pub use format::PoseFormat;
pub use inference::{PoseConfig, PresenceScore};
pub use io::ImageEncoding;
pub use model::{PoseEstimator, PoseModel};
pub use pipeline::{ProcessResponse, ProcessedImage, process_image};
pub use results::{Landmark, Pose};

// Re-export metadata for advanced use
pub use metadata::ModelMetadata;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
