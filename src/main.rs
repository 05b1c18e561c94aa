use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};
use tokio_util::sync::CancellationToken;

use playlist_importer::{
    adapters::AdapterRegistry,
    config::Config,
    detect::{DetectOptions, detect_provider},
    logging::init_tracing,
    ports::fetch::FetchClient,
    services::{
        fetch_client::ReqwestFetchClient,
        import_flow::{FlowResult, ImportFlow},
        import_session::ImportSession,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYLIST_IMPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `playlist_importer=debug`
    #[arg(long, default_value = "warn", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// Export spans to this OTLP/gRPC endpoint
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a playlist link and print the result as JSON
    Import {
        /// Spotify, YouTube or SoundCloud playlist link
        url: String,

        /// Total number of pages to fetch
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },
    /// Show which provider a link belongs to
    Detect {
        url: String,

        /// Also accept Spotify show and episode links
        #[arg(long)]
        podcasts: bool,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(
        env!("CARGO_PKG_NAME"),
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    let result = run(args).await;

    if let Some(tracer_provider) = tracer_provider {
        tracer_provider
            .shutdown()
            .wrap_err("Failed to flush trace exporter")?;
    }
    result
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Import { url, pages } => {
            let config = load_config(args.config.as_deref())?;
            import(&config, &url, pages).await?;
        }
        Commands::Detect { url, podcasts } => {
            let options = DetectOptions {
                podcasts_enabled: podcasts,
            };
            match detect_provider(&url, &options) {
                Some(detection) => println!("{}", serde_json::to_string_pretty(&detection)?),
                None => {
                    return Err(color_eyre::eyre::eyre!("Unsupported playlist link: {url}"));
                }
            }
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                tracing::debug!("Creating default config");
                let path = Config::create_default()?;
                tracing::info!("Default config written to {}", path.display());
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    tracing::debug!("Loading configuration");
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("Failed to load playlist-importer config")
}

async fn import(config: &Config, url: &str, pages: u32) -> Result<()> {
    let fetch: Arc<dyn FetchClient> = Arc::new(ReqwestFetchClient::new(config.request_timeout()));
    let registry = Arc::new(AdapterRegistry::from_config(config, fetch)?);
    let session = Arc::new(ImportSession::new(
        registry,
        DetectOptions {
            podcasts_enabled: config.spotify.podcasts_enabled,
        },
    ));
    let flow = ImportFlow::new(session);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling import");
            ctrl_c.cancel();
        }
    });

    let mut result = flow
        .import_initial(url, &cancel)
        .await
        .wrap_err("Import was cancelled")?;

    for _ in 1..pages {
        let has_more = match &result {
            FlowResult::Ok { data } => data.meta.as_ref().is_some_and(|meta| meta.has_more),
            _ => false,
        };
        if !has_more {
            break;
        }
        result = flow
            .load_more(&cancel)
            .await
            .wrap_err("Import was cancelled")?;
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
