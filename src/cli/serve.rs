// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use crate::cli::args::ServeArgs;
use crate::cli::logging::init_tracing;
use crate::error::{AnnotatorError, Result};
use crate::model::{PoseEstimator, PoseModel};
use crate::server::{self, AppState};

/// Load the model and run the HTTP server until Ctrl-C.
pub fn run_server(args: &ServeArgs) {
    init_tracing("info");

    if let Err(e) = serve(args) {
        tracing::error!("{e}");
        process::exit(1);
    }
}

fn serve(args: &ServeArgs) -> Result<()> {
    let config = args.model.to_config()?;

    tracing::info!("Loading model: {}", args.model.model.display());
    let mut model = PoseModel::load_with_config(&args.model.model, config.clone())?;
    model.warmup()?;
    tracing::info!(
        format = %model.format(),
        landmarks = model.format().num_landmarks(),
        image_encoding = %config.image_encoding,
        "Model ready"
    );

    let state = AppState::new(model, config).with_body_limit(args.body_limit);
    let addr = format!("{}:{}", args.host, args.port);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AnnotatorError::Config(format!("Failed to start async runtime: {e}")))?;

    runtime.block_on(server::serve(&addr, state))
}
