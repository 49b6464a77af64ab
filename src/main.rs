use clap::{Parser, Subcommand};
use log_rag::commands::{index, serve};
use log_rag::config::AppConfig;
use log_rag::telemetry;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a custom log-rag.toml
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Index every file in a directory once and print chunk counts
    Index { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_path(args.config)?;
    telemetry::init_logging(&config);

    match args.cmd {
        Commands::Serve { host, port } => serve::serve_api(host, port, &config).await?,
        Commands::Index { path } => index::index_directory(&path, &config).await?,
    }

    Ok(())
}
