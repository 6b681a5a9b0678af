use tbdl_core::logging;

mod cli;

use crate::cli::{Cli, ShareFailure};

#[tokio::main]
async fn main() {
    // File logging when possible; a broken log dir must not stop a download.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    if let Err(err) = Cli::run_from_args().await {
        match err.downcast_ref::<ShareFailure>() {
            Some(failure) => {
                eprintln!("tbdl error {}", failure);
                std::process::exit(failure.exit_code());
            }
            None => {
                eprintln!("tbdl error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
