use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{errors::Error, Result};

const DEFAULT_DATA_FILE: &str = "./roster-data.json";

/// Which storage backend the process wires up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Process-local; everything is lost on exit.
    Memory,
    /// Snapshot file on disk.
    Json,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "json" | "file" => Ok(Self::Json),
            other => Err(Error::Config(format!(
                "ROSTER_STORAGE must be `memory` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Typed process configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageKind,
    pub data_file: PathBuf,
    pub log_json: bool,
}

impl Config {
    /// Read `.env` (without overriding the real environment), then the
    /// process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let storage = match lookup("ROSTER_STORAGE").and_then(non_empty) {
            Some(raw) => raw.parse()?,
            None => StorageKind::Json,
        };

        let data_file = lookup("ROSTER_DATA_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let log_json = match lookup("ROSTER_LOG_JSON").and_then(non_empty) {
            Some(raw) => parse_bool("ROSTER_LOG_JSON", &raw)?,
            None => false,
        };

        Ok(Self {
            storage,
            data_file,
            log_json,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
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

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key} must be a boolean, got `{other}`"))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
