use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

pub(crate) fn filter_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Env {
    #[serde(default = "default_base_url")]
    pub bridge_llm_base_url: String,
    #[serde(default, deserialize_with = "filter_empty")]
    pub bridge_llm_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub bridge_llm_model: String,
    #[serde(default = "default_timeout_secs")]
    pub bridge_llm_timeout_secs: u64,
}

impl Env {
    pub fn from_env() -> Result<Self, Error> {
        Ok(envy::from_env()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_llm_timeout_secs)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self {
            bridge_llm_base_url: default_base_url(),
            bridge_llm_api_key: None,
            bridge_llm_model: default_model(),
            bridge_llm_timeout_secs: default_timeout_secs(),
        }
    }
}
