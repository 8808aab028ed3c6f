use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::api_connection::endpoints::{
    DEFAULT_API_KEY_ENV_VAR, DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_MODEL, DEFAULT_PROXY_URL,
};
use crate::api_connection::{ApiKey, ChatCompletionGateway, InferenceGateway, ProxyGateway};

pub const GATEWAY_MODE_VAR: &str = "MEAL_LEDGER_GATEWAY";
pub const PROXY_URL_VAR: &str = "MEAL_LEDGER_PROXY_URL";
pub const API_URL_VAR: &str = "MEAL_LEDGER_API_URL";
pub const MODEL_VAR: &str = "MEAL_LEDGER_MODEL";
pub const API_KEY_VAR_VAR: &str = "MEAL_LEDGER_API_KEY_VAR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid MEAL_LEDGER_GATEWAY '{0}', expected 'proxy' or 'direct'")]
    InvalidGatewayMode(String),
    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenv::Error),
}

/// Where prompts are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayConfig {
    /// Through the prompt proxy, which holds the credential.
    Proxy { url: String },
    /// Straight to a chat-completions API. `api_key` is the value of
    /// `api_key_env_var` in the configuration source, if it was set there;
    /// otherwise the gateway looks the variable up itself on each call.
    Direct {
        url: String,
        model: String,
        api_key_env_var: String,
        api_key: Option<ApiKey>,
    },
}

impl GatewayConfig {
    pub fn build(&self) -> Arc<dyn InferenceGateway> {
        match self {
            GatewayConfig::Proxy { url } => Arc::new(ProxyGateway::new(url.clone())),
            GatewayConfig::Direct {
                url,
                model,
                api_key_env_var,
                api_key,
            } => {
                let mut gateway =
                    ChatCompletionGateway::new(url.clone(), model.clone(), api_key_env_var.clone());
                if let Some(key) = api_key {
                    gateway = gateway.with_api_key(key.clone());
                }
                Arc::new(gateway)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::Proxy {
                url: DEFAULT_PROXY_URL.to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads only the given dotenv file; the process environment is neither
    /// consulted nor modified. In direct mode the API key is taken from the
    /// same file.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for item in dotenv::from_path_iter(path)? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = lookup(GATEWAY_MODE_VAR).unwrap_or_else(|| "proxy".to_string());
        let gateway = match mode.trim().to_lowercase().as_str() {
            "proxy" => GatewayConfig::Proxy {
                url: lookup(PROXY_URL_VAR).unwrap_or_else(|| DEFAULT_PROXY_URL.to_string()),
            },
            "direct" => {
                let api_key_env_var = lookup(API_KEY_VAR_VAR)
                    .unwrap_or_else(|| DEFAULT_API_KEY_ENV_VAR.to_string());
                GatewayConfig::Direct {
                    url: lookup(API_URL_VAR)
                        .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string()),
                    model: lookup(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                    api_key: lookup(&api_key_env_var).map(ApiKey::new),
                    api_key_env_var,
                }
            }
            _ => return Err(ConfigError::InvalidGatewayMode(mode)),
        };
        Ok(Self { gateway })
    }
}
