use std::{
    env,
    fs::OpenOptions,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::{Parser, ValueEnum};
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use ledgerly::{
    AppState, build_router,
    export::is_json_file,
    graceful_shutdown,
    stores::{
        BackupTransactionStore, JsonFileStore, MemorySettingsStore, MemoryTransactionStore,
        MemoryUserStore,
        sqlite::{
            SqliteSettingsStore, SqliteTransactionStore, SqliteUserStore, create_app_state,
            initialize,
        },
    },
};

/// The REST API server for ledgerly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The storage backend to serve from.
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    backend: Backend,

    /// File path to the application SQLite database.
    #[arg(long, default_value = "ledgerly.db")]
    db_path: String,

    /// File path to the JSON store file (json backend).
    #[arg(long, default_value = "ledgerly.json")]
    data_path: String,

    /// Mirror the transaction collection into this JSON file as a
    /// best-effort backup (sqlite backend only).
    #[arg(long)]
    backup_path: Option<String>,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Memory,
    Json,
    Sqlite,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let router = match args.backend {
        Backend::Memory => build_router(AppState::new(
            &secret,
            MemoryTransactionStore::new(),
            MemorySettingsStore::new(),
            MemoryUserStore::new(),
        )),
        Backend::Json => {
            assert!(
                is_json_file(std::path::Path::new(&args.data_path)),
                "--data-path must point to a .json file"
            );
            let store = JsonFileStore::open(&args.data_path)
                .expect("Could not open the JSON store file.");

            build_router(AppState::new(&secret, store.clone(), store.clone(), store))
        }
        Backend::Sqlite => {
            let connection =
                Connection::open(&args.db_path).expect("Could not open the database.");

            match &args.backup_path {
                None => build_router(
                    create_app_state(connection, &secret)
                        .expect("Could not initialize the database."),
                ),
                Some(backup_path) => {
                    assert!(
                        is_json_file(std::path::Path::new(backup_path)),
                        "--backup-path must point to a .json file"
                    );
                    initialize(&connection).expect("Could not initialize the database.");
                    let backup = JsonFileStore::open(backup_path)
                        .expect("Could not open the backup store file.");

                    let connection = Arc::new(Mutex::new(connection));
                    let transaction_store = BackupTransactionStore::new(
                        SqliteTransactionStore::new(connection.clone()),
                        backup,
                    );

                    build_router(AppState::new(
                        &secret,
                        transaction_store,
                        SqliteSettingsStore::new(connection.clone()),
                        SqliteUserStore::new(connection),
                    ))
                }
            }
        }
    };

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .unwrap();
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our
        // specific logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
