use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::generate::DEFAULT_MODEL;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const CONFIG_FILE_NAME: &str = "sitesmith.toml";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub port: u16,
    pub allowed_origin: String,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
struct ConfigFile {
    api_key: Option<String>,
    model: Option<String>,
    port: Option<u16>,
    allowed_origin: Option<String>,
}

impl ServerConfig {
    /// Layered load: optional TOML file, then environment overrides.
    /// Missing or malformed configuration degrades to defaults with a
    /// warning; a missing API credential is the caller's problem at
    /// generation time, not startup time.
    pub fn load(override_path: Option<&Path>) -> Self {
        let file = load_config_file(override_path);

        let api_key = env_value("OPENAI_API_KEY").or(file.api_key);
        let model = env_value("OPENAI_MODEL")
            .or(file.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let port = env_value("PORT")
            .and_then(|raw| match raw.parse() {
                Ok(port) => Some(port),
                Err(err) => {
                    eprintln!("Warning: invalid PORT value {raw:?}: {err}");
                    None
                }
            })
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);
        let allowed_origin = env_value("ALLOWED_ORIGIN")
            .or(file.allowed_origin)
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());

        Self {
            api_key,
            model,
            port,
            allowed_origin,
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn load_config_file(override_path: Option<&Path>) -> ConfigFile {
    let path = override_path.map(|p| p.to_path_buf()).or_else(|| {
        let default = PathBuf::from(CONFIG_FILE_NAME);
        default.exists().then_some(default)
    });

    let Some(path) = path else {
        return ConfigFile::default();
    };

    let raw = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!(
                "Warning: failed to read configuration at {}: {err}",
                path.display()
            );
            return ConfigFile::default();
        }
    };

    match parse_config(&raw) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "Warning: failed to parse configuration at {}: {err}",
                path.display()
            );
            ConfigFile::default()
        }
    }
}

fn parse_config(raw: &str) -> Result<ConfigFile, toml::de::Error> {
    toml::from_str(raw)
}
