//! Engine configuration read from environment variables.
//!
//! Every value has a default so a bare `cargo run` starts a working server.
//! Malformed numbers fall back to their default with a warning rather than
//! aborting startup.

use std::str::FromStr;
use std::time::Duration;

use crate::use_cases::retry::RetryPolicy;

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_PATH: &str = "acornquest.db";
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;
pub const DEFAULT_ASSIGNMENT_REWARD_ACORNS: u64 = 10;
pub const DEFAULT_ASSIGNMENT_REWARD_XP: u64 = 25;

/// Which player store backs the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite { path: String },
    Memory,
}

/// Acorns and XP paid for one completed assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentReward {
    pub acorns: u64,
    pub xp: u64,
}

impl Default for AssignmentReward {
    fn default() -> Self {
        Self {
            acorns: DEFAULT_ASSIGNMENT_REWARD_ACORNS,
            xp: DEFAULT_ASSIGNMENT_REWARD_XP,
        }
    }
}

/// Canvas LMS connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasConfig {
    pub base_url: String,
    pub api_token: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_host: String,
    pub server_port: u16,
    pub storage: StorageBackend,
    pub storage_timeout: Duration,
    pub retry: RetryPolicy,
    pub assignment_reward: AssignmentReward,
    pub canvas: Option<CanvasConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            storage: StorageBackend::Sqlite {
                path: DEFAULT_DATABASE_PATH.to_string(),
            },
            storage_timeout: Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS),
            retry: RetryPolicy::with_retries(DEFAULT_CONFLICT_RETRIES),
            assignment_reward: AssignmentReward::default(),
            canvas: None,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_host = var("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());
        let server_port = parse_or(
            "SERVER_PORT",
            var("SERVER_PORT").or_else(|| var("PORT")),
            DEFAULT_SERVER_PORT,
        );

        let storage = match var("STORAGE_BACKEND").as_deref() {
            Some("memory") => StorageBackend::Memory,
            Some("sqlite") | None => StorageBackend::Sqlite {
                path: var("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            },
            Some(other) => {
                tracing::warn!(
                    value = %other,
                    "Unknown STORAGE_BACKEND, falling back to sqlite"
                );
                StorageBackend::Sqlite {
                    path: var("DATABASE_PATH")
                        .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
                }
            }
        };

        let storage_timeout = Duration::from_millis(parse_or(
            "STORAGE_TIMEOUT_MS",
            var("STORAGE_TIMEOUT_MS"),
            DEFAULT_STORAGE_TIMEOUT_MS,
        ));
        let retry = RetryPolicy::with_retries(parse_or(
            "CONFLICT_RETRIES",
            var("CONFLICT_RETRIES"),
            DEFAULT_CONFLICT_RETRIES,
        ));

        let assignment_reward = AssignmentReward {
            acorns: parse_or(
                "ASSIGNMENT_REWARD_ACORNS",
                var("ASSIGNMENT_REWARD_ACORNS"),
                DEFAULT_ASSIGNMENT_REWARD_ACORNS,
            ),
            xp: parse_or(
                "ASSIGNMENT_REWARD_XP",
                var("ASSIGNMENT_REWARD_XP"),
                DEFAULT_ASSIGNMENT_REWARD_XP,
            ),
        };

        let canvas = match (var("CANVAS_BASE_URL"), var("CANVAS_API_TOKEN")) {
            (Some(base_url), Some(api_token)) => Some(CanvasConfig {
                base_url,
                api_token,
            }),
            (Some(_), None) => {
                tracing::warn!("CANVAS_BASE_URL set without CANVAS_API_TOKEN, Canvas disabled");
                None
            }
            _ => None,
        };

        Self {
            server_host,
            server_port,
            storage,
            storage_timeout,
            retry,
            assignment_reward,
            canvas,
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid number, using default");
            default
        }),
    }
}
