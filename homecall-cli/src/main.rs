use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use homecall::client::{RetryPolicy, SignalingClient};
use homecall::model::{IceServerConfig, SignalMessage};
use homecall::server::{RelayConfig, serve};
use homecall::{ParticipantRole, SessionToken};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "homecall")]
#[command(about = "Signaling relay and diagnostics for two-party video sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay. Flags override HOMECALL_* environment variables.
    Serve {
        #[arg(long)]
        bind: Option<String>,

        #[arg(long)]
        room_capacity: Option<usize>,

        /// Seconds an empty room is kept before the sweep drops it.
        #[arg(long)]
        idle_secs: Option<u64>,

        #[arg(long)]
        sweep_secs: Option<u64>,

        /// Repeatable.
        #[arg(long = "stun-url")]
        stun_urls: Vec<String>,
    },

    /// Join a room on a running relay and print what arrives.
    Probe {
        #[arg(long, env = "HOMECALL_URL", default_value = "ws://127.0.0.1:3000/ws")]
        url: String,

        #[arg(long)]
        token: String,

        #[arg(long, value_enum, default_value_t = Role::Operator)]
        role: Role,

        #[arg(long, default_value_t = 30)]
        listen_secs: u64,

        #[arg(long, default_value_t = 5)]
        attempts: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Operator,
    Guest,
}

impl From<Role> for ParticipantRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Operator => ParticipantRole::Operator,
            Role::Guest => ParticipantRole::Guest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Serve {
            bind,
            room_capacity,
            idle_secs,
            sweep_secs,
            stun_urls,
        } => {
            let mut config = RelayConfig::from_env()?;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if let Some(capacity) = room_capacity {
                config.room_capacity = capacity;
            }
            if let Some(secs) = idle_secs {
                config.room_idle_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = sweep_secs {
                config.sweep_interval = Duration::from_secs(secs);
            }
            if !stun_urls.is_empty() {
                config.ice_servers = vec![IceServerConfig::stun(stun_urls)];
            }

            println!(
                "{} {}",
                "Starting relay on".green().bold(),
                config.bind_address.cyan()
            );
            serve(config).await
        }

        Commands::Probe {
            url,
            token,
            role,
            listen_secs,
            attempts,
        } => probe(&url, &token, role.into(), listen_secs, attempts).await,
    }
}

async fn probe(
    url: &str,
    token: &str,
    role: ParticipantRole,
    listen_secs: u64,
    attempts: u32,
) -> Result<()> {
    let token = SessionToken::new(token).context("Invalid session token")?;
    let policy = RetryPolicy {
        max_attempts: attempts,
        ..Default::default()
    };

    println!("{} {}", "Connecting to".cyan(), url);
    let mut channel = SignalingClient::connect(url, &policy).await?;

    let presence = match role {
        ParticipantRole::Operator => SignalMessage::AdminWaiting {
            token: token.clone(),
        },
        ParticipantRole::Guest => SignalMessage::UserOpenedLink {
            token: token.clone(),
        },
    };
    for msg in [
        SignalMessage::JoinRoom {
            token: token.clone(),
        },
        presence,
    ] {
        channel
            .outbound
            .send(msg)
            .context("Relay connection closed")?;
    }
    println!(
        "{} {} as {}",
        "Joined".green().bold(),
        token.redacted(),
        role
    );

    let deadline = tokio::time::sleep(Duration::from_secs(listen_secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            msg = channel.inbound.recv() => match msg {
                Some(msg) => print_message(&msg),
                None => {
                    println!("{}", "Relay closed the connection".red().bold());
                    break;
                }
            },
            _ = &mut deadline => {
                println!("{}", "Listen window elapsed".yellow());
                break;
            }
        }
    }

    let _ = channel.outbound.send(SignalMessage::UserDisconnected { token });
    // Let the writer flush the goodbye.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

fn print_message(msg: &SignalMessage) {
    let kind = msg.kind().as_str();
    match msg {
        SignalMessage::RoomFull { capacity, .. } => {
            println!("{} {} (capacity {})", "<-".red(), kind.red().bold(), capacity)
        }
        SignalMessage::UserDisconnected { .. } => {
            println!("{} {}", "<-".yellow(), kind.yellow().bold())
        }
        SignalMessage::IceConfig { ice_servers } => {
            println!("{} {} ({} server(s))", "<-".cyan(), kind.cyan(), ice_servers.len())
        }
        _ => println!("{} {}", "<-".green(), kind.green()),
    }
}
