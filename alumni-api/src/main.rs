use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use alumni_api::commands::create_user::{create_user, resolve_password, PASSWORD_ENV};
use alumni_api::config::{ApiConfig, CorsConfig};
use alumni_api::routes;
use alumni_api::store::BackendKind;
use anyhow::Context;
use clap::{Parser, Subcommand};
use shared_types::Role;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,

    /// Config file, defaults to <config_dir>/alumni/api.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account in one backend. The password is read from
    /// `ALUMNI_USER_PASSWORD` or, failing that, the first line of stdin.
    CreateUser {
        /// relational (pg) or document (mg)
        #[arg(long, default_value = "relational")]
        backend: BackendKind,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
}

fn init_tracing(log_file_path: Option<&str>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let Some(log_path) = log_file_path else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return None;
    };

    let log_path = std::path::Path::new(log_path);
    let file_appender = tracing_appender::rolling::daily(
        log_path.parent().unwrap_or(std::path::Path::new(".")),
        log_path
            .file_name()
            .unwrap_or(std::ffi::OsStr::new("alumni-api.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    Some(guard)
}

fn cors(config: Option<&CorsConfig>) -> Cors {
    let cors = match config {
        Some(cors_config) => cors_config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
        None => Cors::default().allow_any_origin(),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_file_path.as_deref());

    let (config, config_path) =
        ApiConfig::load(args.config.as_deref()).context("Failed to load config")?;
    tracing::info!("Configuration loaded from {:?}", config_path);

    let (backends, documents) = alumni_api::open_backends(&config)?;

    if let Some(Command::CreateUser {
        backend,
        username,
        email,
        role,
    }) = args.command
    {
        let password = resolve_password(
            std::env::var(PASSWORD_ENV).ok(),
            std::io::stdin().lock(),
        )?;
        let user = create_user(backends.get(backend), &username, &email, &password, role).await?;
        println!(
            "Created {} '{}' with id {} in the {} backend",
            user.role, user.username, user.id, backend
        );
        return Ok(());
    }

    let (host, port) = config.bind_address();
    tracing::info!("Server will listen on {}:{}", host, port);

    let cors_config = config.cors.clone();
    let server_backends = backends.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(cors_config.as_ref()))
            .wrap(Logger::default())
            .configure(routes::configure(server_backends.clone()))
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {}:{}", host, port))?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        tracing::info!("Ctrl+C received, shutting down...");
        handle.stop(true).await;
    });

    server.await?;

    if let Err(e) = documents.flush().await {
        tracing::warn!("Failed to flush document store on shutdown: {}", e);
    }
    tracing::info!("Server stopped");
    Ok(())
}
