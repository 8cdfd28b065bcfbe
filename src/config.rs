use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::app::{guard::DEFAULT_LOADING_COOLDOWN, tasks::DEFAULT_PAGE_SIZE};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// `TASKS_API_URL`
    pub api_url: String,
    /// `TASKS_STORAGE`; `None` means the platform default location.
    pub storage_path: Option<PathBuf>,
    /// `TASKS_PAGE_SIZE`
    pub page_size: u32,
    /// `TASKS_LOADING_COOLDOWN_HOURS`
    pub loading_cooldown: Duration,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            loading_cooldown: DEFAULT_LOADING_COOLDOWN,
        }
    }
}

pub fn read_environment() -> Environment {
    environment_from(|key| std::env::var(key).ok())
}

fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> Environment {
    let defaults = Environment::default();
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let api_url = value("TASKS_API_URL").unwrap_or(defaults.api_url);
    let storage_path = value("TASKS_STORAGE").map(PathBuf::from);
    let page_size = parse_or("TASKS_PAGE_SIZE", value("TASKS_PAGE_SIZE"), defaults.page_size)
        .max(1);
    let loading_cooldown = value("TASKS_LOADING_COOLDOWN_HOURS")
        .map(|raw| {
            Duration::from_secs(parse_or("TASKS_LOADING_COOLDOWN_HOURS", Some(raw), 12u64) * 3600)
        })
        .unwrap_or(defaults.loading_cooldown);

    Environment {
        api_url,
        storage_path,
        page_size,
        loading_cooldown,
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            log::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }
    }
}
