use anyhow::{Context, Result};
use sheetseek_engine::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = sheetseek_cli::cli::parse_args();

    // Ctrl-C stops the scan between units; partial output is still reported.
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping");
        handler_token.cancel();
    })
    .context("install Ctrl-C handler")?;

    sheetseek_cli::cli::run(cli, &token)
}
