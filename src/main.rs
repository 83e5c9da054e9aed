use clap::{Parser, Subcommand};
use tfdocs::TfDocsServer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "tfdocs",
    about = "Terraform Registry documentation and Git module summaries over the Model Context Protocol (MCP).",
    version = APP_VERSION,
    disable_version_flag(true)
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, short = 'V', help = "Print version")]
    pub version: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "stdio", about = "Run the MCP server over stdio")]
    Stdio,

    #[command(name = "http", about = "Run the MCP server over streamable HTTP")]
    Http {
        #[arg(long, short = 'p', default_value_t = 8080, help = "Port to listen on")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    if cli.version {
        println!("{}", APP_VERSION);
        std::process::exit(0);
    }

    let result = match cli.command {
        Some(Commands::Stdio) => {
            info!("Starting tfdocs in stdio mode");
            TfDocsServer::new().serve_stdio().await
        }
        Some(Commands::Http { port }) => {
            info!("Starting tfdocs in HTTP mode on port {}", port);
            TfDocsServer::new().serve_http(port).await
        }
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error running MCP server: {:?}", err);
        std::process::exit(1);
    }
}

// stdout carries the stdio transport, so logs go to stderr
fn init_logging() {
    let log_level = std::env::var("TFDOCS_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tfdocs={},reqwest=warn,hyper=warn", filter).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
