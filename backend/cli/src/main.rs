mod client;
mod config;
mod progress;
mod status_cmd;
mod terminal_output;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use groundwater_analysis::SurveyReport;
use groundwater_gateway::GatewayState;

use client::{AnalysisClient, SurveyFile};
use progress::{ProgressTicker, PROGRESS_INTERVAL, PROGRESS_WINDOW};
use terminal_output::{note_error, note_info, note_success, note_warn, progress_line};

#[derive(Parser)]
#[command(name = "groundwater")]
#[command(about = "Groundwater survey analyzer: API server and upload client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the analysis API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show the status of a running server
    Status {
        /// Server base URL (defaults to the configured local port)
        #[arg(long)]
        server: Option<String>,
    },
    /// Upload a survey image or PDF and print the report
    Analyze {
        /// Survey file (image or PDF, up to 25MB)
        file: PathBuf,
        /// Server base URL (defaults to the configured local port)
        #[arg(long)]
        server: Option<String>,
        /// Check this user's daily quota before uploading
        #[arg(long)]
        user_id: Option<String>,
        /// Print the raw analysis JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = config::load(port).await?;
            let log_dir = config.logging.dir.as_deref().map(Path::new);
            let _guard = logging::init_logger(log_dir, &config.logging.level)?;
            run_server(config).await?;
        }
        Commands::Status { server } => {
            let config = config::load(None).await?;
            let base_url = server.unwrap_or_else(|| config::local_base_url(&config));
            status_cmd::run(&base_url).await?;
        }
        Commands::Analyze {
            file,
            server,
            user_id,
            json,
        } => {
            let config = config::load(None).await?;
            let _guard = logging::init_logger(None, "warn")?;
            let base_url = server.unwrap_or_else(|| config::local_base_url(&config));
            if !run_analyze(&base_url, &file, user_id.as_deref(), json).await {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_server(config: groundwater_config::GroundwaterConfig) -> Result<()> {
    info!(
        addr = %config.listen_addr(),
        environment = %config.server.environment,
        model = %config.provider.model,
        "Starting groundwater survey API"
    );
    let state = GatewayState::from_config(&config);
    groundwater_gateway::start_server(&config.listen_addr(), state).await
}

/// Returns false when the analysis did not produce a report.
async fn run_analyze(base_url: &str, path: &Path, user_id: Option<&str>, raw_json: bool) -> bool {
    let file = match SurveyFile::load(path).await {
        Ok(file) => file,
        Err(e) => {
            note_error(&e.to_string());
            return false;
        }
    };
    if file.extracted_text.is_some() {
        note_info("Attached the PDF's text layer as reference text.");
    }

    let client = AnalysisClient::new(base_url);

    if let Some(user_id) = user_id {
        match client.check_access(user_id).await {
            Ok(access) if !access.has_access => {
                note_error("Daily analysis limit reached. Subscribe for unlimited analyses.");
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                note_error(&e.to_string());
                return false;
            }
        }
    }

    note_info(&format!("Uploading {} ({})", file.file_name, file.mime_type));
    let ticker = ProgressTicker::start(PROGRESS_WINDOW, PROGRESS_INTERVAL, |elapsed| {
        eprint!("\r{}", progress_line(elapsed.as_secs()));
        let _ = std::io::stderr().flush();
    });
    let outcome = client.analyze(&file, user_id).await;
    if ticker.stop().await > 0 {
        eprintln!();
    }

    match outcome {
        Ok(analysis) => {
            note_success("Analysis complete");
            if raw_json {
                match serde_json::to_string_pretty(&analysis) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        note_error(&e.to_string());
                        return false;
                    }
                }
            } else {
                print!("{}", SurveyReport::from_value(&analysis).render_text());
            }
            true
        }
        Err(e) => {
            note_error(&e.to_string());
            if let client::ClientError::Server {
                raw_response: Some(raw),
                ..
            } = &e
            {
                note_warn(&format!("Model output was:\n{raw}"));
            }
            if e.is_retryable() {
                note_warn("Please try again in a moment.");
            }
            false
        }
    }
}
