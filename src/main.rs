use clap::Parser;
use log::error;

use asm_worker::{Application, Config, LogFormat, LogLevel};

/// Queue-driven worker for attack surface management scans.
#[derive(Parser, Debug)]
#[command(name = "asm-worker", version, about)]
struct Cli {
    /// Log level (overrides LOG_LEVEL)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    /// Queue name (overrides QUEUE_NAME)
    #[arg(long)]
    queue: Option<String>,

    /// Blob store root (overrides BLOB_CONNECTION_STRING)
    #[arg(long)]
    blob_root: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.log_format = cli.log_format;
    if let Some(queue) = cli.queue {
        config.queue_name = queue;
    }
    if let Some(root) = cli.blob_root {
        config.blob_connection_string = root;
    }

    if let Err(e) =
        asm_worker::initialization::init_logger(config.log_level.into(), config.log_format)
    {
        eprintln!("failed to initialize logger: {e}");
        std::process::exit(1);
    }

    let app = match Application::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!("failed to initialize worker: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("worker failed: {e:#}");
        std::process::exit(1);
    }
}
