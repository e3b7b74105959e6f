use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use parley_config::load as load_config;
use parley_gateway::{build_router, GatewayState};
use parley_runtime::{telemetry, Services};

#[derive(Parser)]
#[command(name = "parley-server")]
#[command(about = "Parley realtime chat server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server (default)
    Serve,
    /// Seed the database with demo users, tokens and room memberships
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Seed => seed_data().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Parley server");

    let config = load_config().context("failed to load configuration")?;

    let services = Services::initialise(&config)
        .await
        .context("failed to initialise services")?;
    let _sweeper = services.spawn_background_tasks();

    let state = GatewayState::new(
        services.hub.clone(),
        services.identity.clone(),
        services.members.clone(),
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(parley_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("server shut down");
    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = Services::initialise(&config)
        .await
        .context("failed to initialise services")?;

    let users = [
        ("u-alice", "alice", Some("https://avatars/alice.png"), "token-alice"),
        ("u-bob", "bob", Some("https://avatars/bob.png"), "token-bob"),
        ("u-carol", "carol", None, "token-carol"),
    ];

    for (id, username, avatar, token) in users {
        sqlx::query("INSERT OR IGNORE INTO users (id, username, avatar) VALUES (?, ?, ?)")
            .bind(id)
            .bind(username)
            .bind(avatar)
            .execute(&services.pool)
            .await
            .with_context(|| format!("failed to insert user {username}"))?;

        sqlx::query("INSERT OR IGNORE INTO access_tokens (token, user_id) VALUES (?, ?)")
            .bind(token)
            .bind(id)
            .execute(&services.pool)
            .await
            .with_context(|| format!("failed to insert token for {username}"))?;
    }

    let memberships = [
        ("general", "u-alice"),
        ("general", "u-bob"),
        ("general", "u-carol"),
        ("random", "u-alice"),
        ("random", "u-bob"),
        ("founders", "u-alice"),
    ];

    for (room_id, user_id) in memberships {
        sqlx::query("INSERT OR IGNORE INTO room_members (room_id, user_id) VALUES (?, ?)")
            .bind(room_id)
            .bind(user_id)
            .execute(&services.pool)
            .await
            .with_context(|| format!("failed to add {user_id} to {room_id}"))?;
    }

    println!("Seeded demo data:");
    println!("- 3 users (alice, bob, carol) with bearer tokens token-<name>");
    println!("- rooms: general (all), random (alice, bob), founders (alice)");
    println!("Connect with: ws://{}:{}/ws?token=token-alice", config.http.address, config.http.port);

    Ok(())
}
