//! Falafel application entry point.
//!
//! `serve` (the default) bootstraps the server:
//! 1. Load configuration from environment
//! 2. Open the credential store
//! 3. Register templates and build the router
//! 4. Start the live-reload socket in dev mode
//! 5. Serve HTTPS until Ctrl-C
//!
//! The other subcommands manage the credential store offline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use falafel::{
    auth::{self, middleware::session_key, AppState},
    config::Config,
    live_reload,
    models::NewUser,
    render::Renderer,
    routes, server,
    storage::UserStore,
    tls,
};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "falafel", version, about = "Authenticated web server with signed-cookie sessions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTPS server (default)
    Serve,
    /// Print an Argon2id hash of a password
    HashPassword { password: String },
    /// Add a user to the credential store
    AddUser {
        username: String,
        email: String,
        password: String,
    },
    /// Remove a user from the credential store
    RemoveUser { username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::HashPassword { password } => {
            println!("{}", auth::hash_password(&password)?);
            Ok(())
        }
        Command::AddUser {
            username,
            email,
            password,
        } => {
            let config = Config::from_env().context("Failed to load config")?;
            let store = UserStore::open(&config.users_db_path)
                .await
                .context("Failed to open credential store")?;
            let user = store
                .insert(NewUser {
                    username,
                    email,
                    password_hash: auth::hash_password(&password)?,
                })
                .await?;
            println!("Added user '{}' ({})", user.username, user.id);
            Ok(())
        }
        Command::RemoveUser { username } => {
            let config = Config::from_env().context("Failed to load config")?;
            let store = UserStore::open(&config.users_db_path)
                .await
                .context("Failed to open credential store")?;
            if store.remove_by_username(&username).await? {
                println!("Removed user '{}'", username);
                Ok(())
            } else {
                anyhow::bail!("No user named '{}'", username)
            }
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load config")?;
    tracing::info!("Starting falafel on {}", config.bind_addr);

    let users = UserStore::open(&config.users_db_path)
        .await
        .context("Failed to open credential store")?;
    tracing::info!(
        users = users.len().await?,
        path = %users.path().display(),
        "Credential store loaded"
    );

    let tls_config = tls::load_server_config(&config.tls_cert_path, &config.tls_key_path)?;
    let renderer = Renderer::new(config.dev_mode).context("Failed to load templates")?;
    let key = session_key(&config).map_err(anyhow::Error::msg)?;

    let state = AppState {
        users: Arc::new(users),
        renderer: Arc::new(renderer),
        config: Arc::new(config.clone()),
        session_key: key,
    };
    let app = routes::app(state);

    // Ctrl-C stops both listeners
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        let _ = stop_tx.send(true);
    });

    if config.dev_mode {
        let mut stop = stop_rx.clone();
        let addr = config.live_reload_addr;
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            };
            if let Err(e) = live_reload::serve(addr, shutdown).await {
                tracing::error!(error = %e, "Live reload server failed");
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on https://{}", config.bind_addr);

    let mut stop = stop_rx;
    server::serve_tls(listener, tls_config, app, async move {
        let _ = stop.wait_for(|stopped| *stopped).await;
    })
    .await
}
