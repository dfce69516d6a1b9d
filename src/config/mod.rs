use crate::core::error::EloyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_PORT: u16 = 10000;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_assistant_name() -> String {
    "Eloy".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_temperature() -> f32 {
    0.7
}

fn default_banco_path() -> PathBuf {
    PathBuf::from("banco.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Groq,
    OpenAI,
    OpenRouter,
}

impl Provider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Some(Provider::Groq),
            "openai" => Some(Provider::OpenAI),
            "openrouter" => Some(Provider::OpenRouter),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => DEFAULT_MODEL,
            Provider::OpenAI => "gpt-4.1-mini",
            Provider::OpenRouter => "meta-llama/llama-3.3-70b-instruct",
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Provider::Groq
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Where business records are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StorageConfig {
    JsonFile {
        #[serde(default = "default_banco_path")]
        path: PathBuf,
    },
    Remote {
        url: String,
        api_key: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::JsonFile {
            path: default_banco_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub active_provider: Provider,
    #[serde(default)]
    pub providers: HashMap<Provider, ProviderConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_provider: Provider::default(),
            providers: HashMap::new(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            assistant_name: default_assistant_name(),
            request_timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".eloy")
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("history.txt")
    }

    /// Reads the YAML file at `path` (or the default location). A missing
    /// file yields the defaults; a file that does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, EloyError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config = Self::from_yaml(&contents)
            .map_err(|e| EloyError::Config(format!("Parse {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Config, EloyError> {
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yml::from_str::<Config>(contents)?)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, EloyError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(&path, yaml_content)?;
        Ok(path)
    }

    /// Applies process environment overrides.
    pub fn apply_env(&mut self) -> Result<(), EloyError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any variable lookup. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), EloyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get("ELOY_PROVIDER") {
            self.active_provider = Provider::from_str(&name)
                .ok_or_else(|| EloyError::Config(format!("Unsupported provider: {}", name)))?;
        }

        let provider = self.active_provider;
        let entry = self.providers.entry(provider).or_default();
        if let Some(key) = get("ELOY_API_KEY").or_else(|| get("GROQ_API_KEY")) {
            entry.api_key = Some(key);
        }
        if let Some(model) = get("ELOY_MODEL") {
            entry.model = Some(model);
        }
        if let Some(base_url) = get("ELOY_BASE_URL") {
            entry.base_url = Some(base_url);
        }

        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| EloyError::Config(format!("Invalid PORT: {}", port)))?;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(origin) = get("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }

        match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(api_key)) => {
                self.storage = StorageConfig::Remote { url, api_key };
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(EloyError::Config(
                    "SUPABASE_URL and SUPABASE_KEY must be set together".to_string(),
                ));
            }
            (None, None) => {
                if let Some(path) = get("BANCO_PATH") {
                    self.storage = StorageConfig::JsonFile {
                        path: PathBuf::from(path),
                    };
                }
            }
        }

        Ok(())
    }

    /// Settings for the active provider, with defaults filled in.
    pub fn provider_config(&self) -> ProviderConfig {
        let provider = self.active_provider;
        let configured = self.providers.get(&provider).cloned().unwrap_or_default();
        ProviderConfig {
            api_key: configured.api_key.filter(|k| !k.trim().is_empty()),
            base_url: configured
                .base_url
                .or_else(|| Some(provider.default_base_url().to_string())),
            model: configured
                .model
                .or_else(|| Some(provider.default_model().to_string())),
        }
    }
}
