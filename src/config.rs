use std::time::Duration;

use crate::models::user::UserIdentity;
use crate::pipeline::PipelineConfig;

/// A credential accepted by the static identity resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub token: String,
    pub user: UserIdentity,
}

pub struct Config {
    pub port: u16,
    pub workers: usize,
    pub buffer_capacity: usize,
    pub send_timeout: Duration,
    pub outbound_queue: usize,
    pub shutdown_grace: Duration,
    pub tokens: Vec<TokenEntry>,
}

const DEFAULT_BUFFER_CAPACITY: usize = 1024 * 256;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let workers = env_parse::<usize>("EASEL_WORKERS")
            .filter(|w| *w > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            });

        let tokens = std::env::var("EASEL_TOKENS")
            .map(|raw| parse_tokens(&raw))
            .unwrap_or_default();

        Self {
            port: env_parse("PORT").unwrap_or(39100),
            workers,
            buffer_capacity: env_parse::<usize>("EASEL_BUFFER_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_BUFFER_CAPACITY),
            send_timeout: Duration::from_millis(
                env_parse("EASEL_SEND_TIMEOUT_MS").unwrap_or(2000),
            ),
            outbound_queue: env_parse::<usize>("EASEL_OUTBOUND_QUEUE")
                .filter(|q| *q > 0)
                .unwrap_or(256),
            shutdown_grace: Duration::from_secs(
                env_parse("EASEL_SHUTDOWN_GRACE_SECS").unwrap_or(30),
            ),
            tokens,
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            capacity: self.buffer_capacity,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

/// Parse `token:userId:displayName` entries separated by commas.
/// Malformed entries are skipped with a warning.
pub fn parse_tokens(raw: &str) -> Vec<TokenEntry> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let token = parts.next().filter(|t| !t.is_empty());
            let id = parts.next().and_then(|id| id.trim().parse::<i64>().ok());
            let name = parts.next().map(str::trim).filter(|n| !n.is_empty());
            match (token, id, name) {
                (Some(token), Some(id), Some(name)) => Some(TokenEntry {
                    token: token.to_string(),
                    user: UserIdentity::new(id, name),
                }),
                _ => {
                    tracing::warn!("skipping malformed EASEL_TOKENS entry");
                    None
                }
            }
        })
        .collect()
}
