use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match wikiedit::cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
