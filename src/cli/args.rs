// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::device::Device;
use crate::error::{AnnotatorError, Result};
use crate::format::PoseFormat;
use crate::inference::{PoseConfig, PresenceScore};
use crate::io::ImageEncoding;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    pose-annotator serve --model pose_landmark_full.onnx
    pose-annotator serve --model yolo11n-pose.onnx --port 8080 --image-encoding latin1
    MODEL_PATH=pose.onnx PORT=5000 pose-annotator serve
    pose-annotator predict --model pose.onnx --source person.jpg --save annotated.jpg
    pose-annotator predict -m pose.onnx -s person.jpg --seen-all-keypoints"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP annotation server
    #[cfg(feature = "server")]
    Serve(ServeArgs),
    /// Annotate a single image and print the JSON response
    Predict(PredictArgs),
}

/// Options shared by every command that loads a model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to ONNX pose model file
    #[arg(short, long, env = "MODEL_PATH")]
    pub model: PathBuf,

    /// Landmark layout: auto, blazepose or coco
    #[arg(long, default_value = "auto")]
    pub format: String,

    /// Device to use (cpu, cuda:0, mps, coreml, directml:0)
    #[arg(long, default_value_t = Device::Cpu)]
    pub device: Device,

    /// Number of intra-op threads (0 = runtime default)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Visibility threshold for "all keypoints visible" and drawing
    #[arg(long, default_value_t = 0.5)]
    pub visibility: f32,

    /// Scale of the BlazePose pose-flag output (logit or probability)
    #[arg(long, default_value_t = PresenceScore::Logit)]
    pub presence_score: PresenceScore,

    /// JPEG quality of the returned image (1-100)
    #[arg(long, default_value_t = 95, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// Encoding of the image field in the JSON response (base64 or latin1)
    #[arg(long, default_value_t = ImageEncoding::Base64)]
    pub image_encoding: ImageEncoding,
}

impl ModelArgs {
    /// Build the pose configuration these options describe.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::Config`] for an unknown `--format`.
    pub fn to_config(&self) -> Result<PoseConfig> {
        let mut config = PoseConfig::new()
            .with_device(self.device.clone())
            .with_threads(self.threads)
            .with_visibility_threshold(self.visibility)
            .with_presence_score(self.presence_score)
            .with_jpeg_quality(self.jpeg_quality)
            .with_image_encoding(self.image_encoding);

        if !self.format.eq_ignore_ascii_case("auto") {
            let format: PoseFormat = self
                .format
                .parse()
                .map_err(|e: crate::format::FormatParseError| AnnotatorError::Config(e.to_string()))?;
            config = config.with_format(format);
        }

        Ok(config)
    }
}

/// Arguments for the serve command.
#[cfg(feature = "server")]
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = crate::server::DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for the predict command.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Input image
    #[arg(short, long)]
    pub source: PathBuf,

    /// Skip drawing the skeleton
    #[arg(long, default_value_t = false)]
    pub seen_all_keypoints: bool,

    /// Write the annotated JPEG to this path
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Include the encoded image in the printed JSON
    #[arg(long, default_value_t = false)]
    pub include_image: bool,

    /// Show verbose output
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_serve_args_defaults() {
        let args = Cli::parse_from(["app", "serve", "--model", "pose.onnx"]);
        match args.command {
            Commands::Serve(serve) => {
                assert_eq!(serve.model.model, PathBuf::from("pose.onnx"));
                assert_eq!(serve.port, DEFAULT_PORT);
                assert_eq!(serve.model.format, "auto");
                assert_eq!(serve.model.device, Device::Cpu);
                assert_eq!(serve.model.jpeg_quality, 95);
                assert_eq!(serve.model.image_encoding, ImageEncoding::Base64);
            }
            Commands::Predict(_) => panic!("expected serve"),
        }
    }

    #[test]
    fn test_predict_args_custom() {
        let args = Cli::parse_from([
            "app",
            "predict",
            "-m",
            "custom.onnx",
            "-s",
            "person.jpg",
            "--seen-all-keypoints",
            "--save",
            "out.jpg",
            "--image-encoding",
            "latin1",
            "--device",
            "cuda:1",
            "--presence-score",
            "probability",
        ]);
        match args.command {
            Commands::Predict(predict) => {
                assert_eq!(predict.source, PathBuf::from("person.jpg"));
                assert!(predict.seen_all_keypoints);
                assert_eq!(predict.save, Some(PathBuf::from("out.jpg")));
                assert!(!predict.include_image);
                assert_eq!(predict.model.image_encoding, ImageEncoding::Latin1);
                assert_eq!(predict.model.device, Device::Cuda(1));
                assert_eq!(predict.model.presence_score, PresenceScore::Probability);
            }
            #[cfg(feature = "server")]
            Commands::Serve(_) => panic!("expected predict"),
        }
    }

    #[test]
    fn test_model_args_to_config() {
        let args = Cli::parse_from([
            "app", "predict", "-m", "pose.onnx", "-s", "a.jpg", "--format", "coco", "--threads", "2",
        ]);
        let Commands::Predict(predict) = args.command else {
            panic!("expected predict");
        };
        let config = predict.model.to_config().unwrap();
        assert_eq!(config.format, Some(PoseFormat::Coco));
        assert_eq!(config.num_threads, 2);
        assert_eq!(config.presence_score, PresenceScore::Logit);

        let mut model = predict.model.clone();
        model.format = "auto".to_string();
        assert_eq!(model.to_config().unwrap().format, None);

        model.format = "hands".to_string();
        assert!(matches!(model.to_config(), Err(AnnotatorError::Config(_))));
    }

    #[test]
    fn test_jpeg_quality_range() {
        let result = Cli::try_parse_from([
            "app",
            "predict",
            "--model",
            "pose.onnx",
            "--source",
            "person.jpg",
            "--jpeg-quality",
            "0",
        ]);
        assert!(result.is_err());
    }
}
