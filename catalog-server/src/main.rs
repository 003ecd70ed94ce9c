use anyhow::{Context, Result};
use catalog_server::{
    auth,
    config::{Config, LoggingConfig},
    database::Database,
    routes::create_router,
    state::AppState,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Serve the recipe catalog")]
struct Args {
    /// Path to the YAML configuration file
    #[clap(long, global = true, default_value = "catalog.yml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server
    Serve {
        /// The address and optionally port to bind to, overriding the config file
        #[clap(long)]
        address: Option<String>,
    },
    /// Add an account that can sign in
    CreateUser {
        username: String,
        /// Let this user into the admin console
        #[clap(long)]
        staff: bool,
        #[clap(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Log JSON lines to a daily file when a directory is configured, plain text to stdout otherwise.
fn init_tracing(conf: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match &conf.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "access.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .json()
                .with_writer(non_blocking)
                .with_env_filter(EnvFilter::from_default_env())
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();
    let found = Config::load_if_present(&args.config)?;
    let missing = found.is_none();
    let config = found.unwrap_or_default();
    let _guard = init_tracing(&config.logging);
    if missing {
        tracing::warn!("{} not found, using default configuration", args.config);
    }

    match args.command {
        Command::Serve { address } => serve(config, address).await,
        Command::CreateUser {
            username,
            staff,
            password,
        } => {
            let db = Database::connect(&config.database)
                .await
                .context("Connecting to database")?;
            let user = auth::create_user(&db, &username, &password, staff)
                .with_context(|| format!("Creating user {username}"))?;
            tracing::info!("Created user {} (id {})", user.username, user.user_id);
            println!("Created user {}", user.username);
            Ok(())
        }
    }
}

async fn serve(config: Config, address: Option<String>) -> Result<()> {
    let address = address.unwrap_or_else(|| config.server.address.clone());
    let tls = config.server.tls.clone();
    let state = AppState::from_config(config)
        .await
        .context("Preparing application state")?;
    let app = create_router(state);

    // Plain HTTP unless certificates are configured
    if let Some(tls) = tls {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .context("Loading TLS certificate")?;

        let addr = address.parse().context("Parsing the listen address")?;
        tracing::info!("Listening on {} with TLS", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Binding {address}"))?;
        tracing::info!("Listening on {}", address);
        axum::serve(listener, app).await?;
    }
    Ok(())
}
