//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;

use chrono::Duration;

use crate::jobs::JobSettings;

pub const DEFAULT_TASK_STREAM_PREFIX: &str = "cadence:tasks";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Which scheduling backend the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerKind {
    #[default]
    Inline,
    DurableQueue,
    Test,
}

impl FromStr for SchedulerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(SchedulerKind::Inline),
            "durable_queue" | "durable-queue" => Ok(SchedulerKind::DurableQueue),
            "test" => Ok(SchedulerKind::Test),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub scheduler: SchedulerKind,
    pub redis_url: Option<String>,
    pub task_stream_prefix: String,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// Forward window past now for the past-cycle walk.
    pub billing_past_lookahead: Duration,
    pub monitor_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            redis_url: None,
            task_stream_prefix: DEFAULT_TASK_STREAM_PREFIX.to_string(),
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            billing_past_lookahead: Duration::days(365),
            monitor_interval: Duration::minutes(5),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let scheduler = parse_or(&get, "JOBS_SCHEDULER", defaults.scheduler)?;
        let bind_addr = parse_or(&get, "BIND_ADDR", defaults.bind_addr)?;
        let lookahead_days: i64 = parse_or(&get, "BILLING_PAST_LOOKAHEAD_DAYS", 365)?;
        let monitor_secs: i64 = parse_or(&get, "MONITOR_INTERVAL_SECS", 300)?;

        Ok(Self {
            scheduler,
            redis_url: get("REDIS_URL"),
            task_stream_prefix: get("TASK_STREAM_PREFIX").unwrap_or(defaults.task_stream_prefix),
            database_url: get("DATABASE_URL"),
            bind_addr,
            billing_past_lookahead: positive_duration(
                "BILLING_PAST_LOOKAHEAD_DAYS",
                lookahead_days,
                Duration::try_days,
            )?,
            monitor_interval: positive_duration(
                "MONITOR_INTERVAL_SECS",
                monitor_secs,
                Duration::try_seconds,
            )?,
        })
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            monitor_interval: self.monitor_interval,
            ..JobSettings::default()
        }
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(var).map_or(Ok(default), |value| parse(var, value))
}

fn positive_duration(
    var: &'static str,
    amount: i64,
    build: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    build(amount)
        .filter(|_| amount > 0)
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: amount.to_string(),
        })
}
