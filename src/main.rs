use server::{Server, ServerCreationError};
use thiserror::Error;
use tracing::{error, info};

use std::path::PathBuf;

use app::App;
use db::{Db, DbCreationError};
use omdb::OmdbCatalog;
use poster_cache::PosterCache;
use watchlist::{KeyValueStore, MemoryStore};

mod app;
mod catalog;
mod controller;
mod db;
mod omdb;
mod poster_cache;
mod server;
mod types;
mod watchlist;

const API_KEY_ENV: &str = "OMDB_API_KEY";

#[derive(Error, Debug)]
enum ArgParseError {
    #[error("Unknown arg {0}")]
    UnknownArg(String),
    #[error("No port argument provided")]
    NoPort,
    #[error("Invalid port")]
    InvalidPort(#[source] std::num::ParseIntError),
    #[error("No api key provided, pass --api-key or set {}", API_KEY_ENV)]
    NoApiKey,
    #[error("No data dir argument provided")]
    NoDataDir,
}

enum Storage {
    DataDir(PathBuf),
    Ephemeral,
}

struct Args {
    html_path: Option<PathBuf>,
    port: u16,
    api_key: String,
    storage: Storage,
}

impl Args {
    fn parse() -> Result<Args, ArgParseError> {
        let mut args = std::env::args();
        let _process_name = args.next();

        let mut html_path = None;
        let mut port = None;
        let mut api_key = None;
        let mut data_dir = None;
        let mut ephemeral = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" => {
                    println!("{}", Self::help());
                    std::process::exit(1);
                }
                "--html-path" => {
                    html_path = args.next().map(Into::into);
                }
                "--port" => {
                    port = args.next().map(|s| s.parse());
                }
                "--api-key" => api_key = args.next(),
                "--data-dir" => data_dir = args.next().map(Into::into),
                "--ephemeral" => ephemeral = true,
                _ => {
                    return Err(ArgParseError::UnknownArg(arg));
                }
            }
        }

        let port = port
            .ok_or(ArgParseError::NoPort)?
            .map_err(ArgParseError::InvalidPort)?;

        let api_key = api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or(ArgParseError::NoApiKey)?;

        let storage = match (data_dir, ephemeral) {
            (_, true) => Storage::Ephemeral,
            (Some(data_dir), false) => Storage::DataDir(data_dir),
            (None, false) => return Err(ArgParseError::NoDataDir),
        };

        let ret = Args {
            html_path,
            port,
            api_key,
            storage,
        };

        Ok(ret)
    }

    fn help() -> String {
        let process_name = std::env::args()
            .next()
            .unwrap_or_else(|| "omdb-browser".to_string());

        format!(
            "Search the OMDb catalog and keep a watchlist\n\
                \n\
                Usage: {process_name} [ARGS]\n\
                \n\
                Args:\n\
                --help: Show this help\n\
                --port: Port to serve the API on\n\
                --api-key: OMDb api key, falls back to the {API_KEY_ENV} environment variable\n\
                --data-dir: Directory holding the watchlist db and cached posters\n\
                --ephemeral: Keep the watchlist in memory instead of --data-dir\n\
                --html-path: Optional path to a front-end to serve at /\n\
                "
        )
    }
}

#[derive(Error, Debug)]
enum RunError {
    #[error("failed to create data dir")]
    CreateDataDir(#[source] std::io::Error),
    #[error("failed to create temp dir")]
    CreateTempDir(#[source] std::io::Error),
    #[error("failed to open watchlist db")]
    OpenDb(#[from] DbCreationError),
    #[error("failed to create server")]
    CreateServer(#[from] ServerCreationError),
    #[error("failed to serve")]
    Serve(#[source] std::io::Error),
}

fn serve<S: KeyValueStore>(args: &Args, store: S, posters: PosterCache) -> Result<(), RunError> {
    let app = App::new(OmdbCatalog::new(args.api_key.clone()), store, posters);

    let initial = app.refresh();
    info!(
        "Initial search for \"{}\" returned {} results",
        initial.query.keyword(),
        initial.results.total_count
    );

    let server = Server::new(args.html_path.as_deref(), app)?;
    info!("Listening on 127.0.0.1:{}", args.port);
    futures::executor::block_on(server.serve(args.port)).map_err(RunError::Serve)
}

fn run(args: Args) -> Result<(), RunError> {
    match &args.storage {
        Storage::DataDir(data_dir) => {
            std::fs::create_dir_all(data_dir).map_err(RunError::CreateDataDir)?;
            let db = Db::new(&data_dir.join("watchlist.db"))?;
            let posters = PosterCache::new(data_dir.join("posters"));
            serve(&args, db, posters)
        }
        Storage::Ephemeral => {
            let temp_dir = tempfile::tempdir().map_err(RunError::CreateTempDir)?;
            info!("Watchlist will not be persisted");
            let posters = PosterCache::new(temp_dir.path().join("posters"));
            serve(&args, MemoryStore::new(), posters)
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = match Args::parse() {
        Ok(v) => v,
        Err(e) => {
            println!("{}", e);
            println!();
            println!("{}", Args::help());
            return;
        }
    };

    if let Err(e) = run(args) {
        error!("{e}");
        let mut source = std::error::Error::source(&e);
        while let Some(e) = source {
            error!("Caused by: {e}");
            source = std::error::Error::source(e);
        }
    }
}
