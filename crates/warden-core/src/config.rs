use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (with `.env` support).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub admin_id: i64,

    // Storage
    pub db_path: PathBuf,
    pub banned_words_path: PathBuf,

    // Moderation
    /// How long warning/welcome messages stay up before auto-deletion.
    pub warning_delete_delay: Duration,

    // Broadcast
    pub broadcast_send_interval: Duration,
    pub failure_sample_limit: usize,
    pub preview_max_len: usize,

    // Behavior flags
    /// When false, /stats is admin-only.
    pub stats_public: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_id = env_i64("ADMIN_ID").ok_or_else(|| {
            Error::Config("ADMIN_ID environment variable is required (numeric)".to_string())
        })?;

        let db_path = env_path("DB_PATH").unwrap_or_else(|| PathBuf::from("warden.db"));
        let banned_words_path =
            env_path("BANNED_WORDS_PATH").unwrap_or_else(|| PathBuf::from("banned_words.txt"));

        let warning_delete_delay =
            Duration::from_secs(env_u64("WARNING_DELETE_SECS").unwrap_or(20));
        let broadcast_send_interval =
            Duration::from_millis(env_u64("BROADCAST_SEND_INTERVAL_MS").unwrap_or(80));
        let failure_sample_limit = env_usize("FAILURE_SAMPLE_LIMIT").unwrap_or(50);
        let preview_max_len = env_usize("PREVIEW_MAX_LEN").unwrap_or(200);

        let stats_public = env_bool("STATS_PUBLIC").unwrap_or(true);

        Ok(Self {
            telegram_bot_token,
            admin_id,
            db_path,
            banned_words_path,
            warning_delete_delay,
            broadcast_send_interval,
            failure_sample_limit,
            preview_max_len,
            stats_public,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}
