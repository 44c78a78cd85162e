// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::fs;
use std::process;
use std::time::Instant;

use serde_json::json;

use crate::cli::args::PredictArgs;
use crate::cli::logging::{init_tracing, set_verbose};
use crate::error::Result;
use crate::format::PoseFormat;
use crate::model::{PoseEstimator, PoseModel};
use crate::pipeline::{ProcessedImage, process_image};
use crate::results::Landmark;
use crate::{VERSION, error, section, success, verbose};

/// Annotate one image and print the JSON response to stdout.
pub fn run_prediction(args: &PredictArgs) {
    set_verbose(args.verbose);
    init_tracing(if args.verbose { "pose_annotator=debug" } else { "warn" });

    if let Err(e) = predict(args) {
        error!("{e}");
        process::exit(1);
    }
}

fn predict(args: &PredictArgs) -> Result<()> {
    let config = args.model.to_config()?;

    section!("pose-annotator {VERSION}");
    verbose!("Model: {}", args.model.model.display());
    verbose!("Source: {}", args.source.display());

    let mut model = PoseModel::load_with_config(&args.model.model, config.clone())?;
    verbose!(
        "Format: {} ({} landmarks), input {:?}, device {}",
        model.format(),
        model.format().num_landmarks(),
        model.input_size(),
        config.device
    );
    if let Some(description) = &model.metadata().description {
        verbose!("Description: {description}");
    }

    let bytes = fs::read(&args.source)?;

    let start = Instant::now();
    let processed = process_image(&mut model, &bytes, args.seen_all_keypoints, &config)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    verbose!(
        "{}x{}: {} landmarks, all visible: {}, overlay: {}, {elapsed_ms:.1}ms",
        processed.dimensions.0,
        processed.dimensions.1,
        processed.keypoints.len(),
        processed.all_keypoints_visible,
        processed.policy.as_str()
    );
    let hidden = hidden_landmarks(model.format(), &processed.keypoints, config.visibility_threshold);
    if !hidden.is_empty() {
        verbose!("Not visible: {}", hidden.join(", "));
    }

    if let Some(path) = &args.save {
        fs::write(path, &processed.jpeg)?;
        success!("Saved annotated image to {}", path.display());
    }

    println!("{}", render_json(processed, args.include_image, &config)?);
    Ok(())
}

/// Names of the landmarks at or below the visibility threshold.
fn hidden_landmarks(
    format: PoseFormat,
    keypoints: &[Landmark],
    threshold: f32,
) -> Vec<&'static str> {
    format
        .landmark_names()
        .iter()
        .zip(keypoints)
        .filter(|(_, lm)| !lm.is_visible(threshold))
        .map(|(name, _)| *name)
        .collect()
}

/// The `/process_image` response body, with the image left out unless requested.
fn render_json(
    processed: ProcessedImage,
    include_image: bool,
    config: &crate::PoseConfig,
) -> Result<String> {
    let response = processed.into_response(config.image_encoding);
    let value = if include_image {
        serde_json::to_value(&response)
    } else {
        Ok(json!({
            "keypoints": response.keypoints,
            "all_keypoints_visible": response.all_keypoints_visible,
        }))
    }
    .map_err(|e| crate::AnnotatorError::Encode(format!("Failed to serialize response: {e}")))?;

    serde_json::to_string_pretty(&value)
        .map_err(|e| crate::AnnotatorError::Encode(format!("Failed to serialize response: {e}")))
}
