//! Relay configuration, loaded from `HOMECALL_*` environment variables.

use anyhow::{Context, Result};
use homecall_core::IceServerConfig;
use homecall_core::utils::SESSION_CAPACITY;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address (e.g. "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum endpoints per session token.
    pub room_capacity: usize,

    /// How long a room may stay empty before the sweep drops it.
    pub room_idle_timeout: Duration,

    /// Period of the idle-room sweep.
    pub sweep_interval: Duration,

    /// Handed to every client on connect.
    pub ice_servers: Vec<IceServerConfig>,

    /// Capacity of the transport → relay command queue.
    pub command_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            room_capacity: SESSION_CAPACITY,
            room_idle_timeout: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(60),
            ice_servers: IceServerConfig::default_stun(),
            command_buffer: 256,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let ice_servers = match env::var("HOMECALL_STUN_URLS") {
            Ok(raw) => parse_stun_urls(&raw),
            Err(_) => defaults.ice_servers,
        };

        Ok(Self {
            bind_address: env::var("HOMECALL_BIND").unwrap_or(defaults.bind_address),
            room_capacity: parse_var("HOMECALL_ROOM_CAPACITY")?.unwrap_or(defaults.room_capacity),
            room_idle_timeout: parse_var("HOMECALL_ROOM_IDLE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_idle_timeout),
            sweep_interval: parse_var("HOMECALL_SWEEP_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            ice_servers,
            command_buffer: defaults.command_buffer,
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(None),
    }
}

fn parse_stun_urls(raw: &str) -> Vec<IceServerConfig> {
    let urls: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_owned)
        .collect();

    if urls.is_empty() {
        Vec::new()
    } else {
        vec![IceServerConfig::stun(urls)]
    }
}
