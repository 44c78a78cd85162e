// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::Parser;

use pose_annotator::cli::args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        #[cfg(feature = "server")]
        Commands::Serve(args) => pose_annotator::cli::serve::run_server(args),
        Commands::Predict(args) => pose_annotator::cli::predict::run_prediction(args),
    }
}
