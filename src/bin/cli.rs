//! Screening intake CLI
//!
//! Local execution entry point. For AWS Lambda, use `screening-lambda`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use screening::{
    client::{HttpApi, LocalApi, ScreeningApi},
    config::load_config,
    error::Result,
    models::{Config, MediaFile, MediaKind},
    pipeline::{self, IntakeFiles},
    services::AppState,
    utils::console,
};

/// Screening intake: selfie, video and EEG submission
#[derive(Parser, Debug)]
#[command(name = "screening", version, about = "Clinical screening intake client")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "screening.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full screening submission: count, video, image, eeg, analysis
    Submit {
        /// Identifier of the user being screened
        #[arg(long)]
        user_id: String,

        /// Selfie image
        #[arg(long)]
        photo: PathBuf,

        /// Recorded video
        #[arg(long)]
        video: PathBuf,

        /// EEG recording (.csv)
        #[arg(long)]
        eeg: PathBuf,

        /// Retries of a failed stage (default: client.max_retries)
        #[arg(long)]
        retries: Option<u32>,

        /// Call the services in-process instead of over HTTP
        #[arg(long)]
        local: bool,
    },

    /// Show how many screenings a user has completed
    Count {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        local: bool,
    },

    /// Upload a single file and print its storage key
    Upload {
        /// image, video or eeg
        kind: MediaKind,

        file: PathBuf,

        #[arg(long)]
        local: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config)?;
    console::init(if cli.verbose { "debug" } else { &config.logging.level });
    log::debug!("Loaded configuration from {}", cli.config.display());

    let config = Arc::new(config);

    match cli.command {
        Command::Submit {
            user_id,
            photo,
            video,
            eeg,
            retries,
            local,
        } => {
            let files = IntakeFiles { photo, video, eeg };
            let mut client = config.client.clone();
            if let Some(retries) = retries {
                client.max_retries = retries;
            }

            if local {
                let api = local_api(&config).await?;
                pipeline::run_intake(api, &config.uploads, &client, &user_id, &files).await?;
            } else {
                let api = HttpApi::from_config(&client)?;
                pipeline::run_intake(api, &config.uploads, &client, &user_id, &files).await?;
            }
        }

        Command::Count { user_id, local } => {
            let count = if local {
                local_api(&config).await?.get_count(&user_id).await?
            } else {
                HttpApi::from_config(&config.client)?
                    .get_count(&user_id)
                    .await?
            };
            console::info(&format!("User {} has {} prior screening(s)", user_id, count));
        }

        Command::Upload { kind, file, local } => {
            let media = MediaFile::from_path(&file).await?;
            let key = if local {
                local_api(&config).await?.upload(kind, &media).await?
            } else {
                HttpApi::from_config(&config.client)?
                    .upload(kind, &media)
                    .await?
            };
            console::success(&format!("Uploaded {} as {}", file.display(), key));
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());
            // Strict load: no fallback to defaults
            if let Err(e) = Config::load(&cli.config).and_then(|c| c.validate()) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            console::success("Config OK");
        }
    }

    Ok(())
}

/// In-process API over the storage backend named in the config.
async fn local_api(config: &Arc<Config>) -> Result<LocalApi> {
    let state = AppState::from_config(Arc::clone(config)).await?;
    Ok(LocalApi::new(state))
}
