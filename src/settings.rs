use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{LedgerError, Result};

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8000";

/// Process-wide settings, read once at startup and handed to constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub google_gen_ai_api_key: String,
    pub google_gen_ai_model_name: String,
    pub google_gen_ai_model_temp: f32,
    pub google_gen_ai_model_max_tokens: u32,
    pub google_gen_ai_model_top_p: f32,
    /// Replacement extraction instructions, read from `GOOGLE_GEN_AI_MODEL_PROMPT_PATH`.
    pub google_gen_ai_model_instructions: Option<String>,
    pub local_storage_dir_path: PathBuf,
    pub server_addr: String,
}

impl Settings {
    /// Loads `.env` (if present) into the environment, then reads the settings from it.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instructions = match lookup("GOOGLE_GEN_AI_MODEL_PROMPT_PATH") {
            Some(path) => Some(std::fs::read_to_string(&path).map_err(|e| {
                LedgerError::Config(format!(
                    "GOOGLE_GEN_AI_MODEL_PROMPT_PATH: cannot read {}: {}",
                    path, e
                ))
            })?),
            None => None,
        };

        Ok(Self {
            google_gen_ai_api_key: required(&lookup, "GOOGLE_GEN_AI_API_KEY")?,
            google_gen_ai_model_name: required(&lookup, "GOOGLE_GEN_AI_MODEL_NAME")?,
            google_gen_ai_model_temp: parsed(&lookup, "GOOGLE_GEN_AI_MODEL_TEMP")?,
            google_gen_ai_model_max_tokens: parsed(&lookup, "GOOGLE_GEN_AI_MODEL_MAX_TOKENS")?,
            google_gen_ai_model_top_p: parsed(&lookup, "GOOGLE_GEN_AI_MODEL_TOP_P")?,
            google_gen_ai_model_instructions: instructions,
            local_storage_dir_path: PathBuf::from(required(&lookup, "LOCAL_STORAGE_DIR_PATH")?),
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| LedgerError::Config(format!("{} is not set", key)))
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = required(lookup, key)?;
    raw.trim()
        .parse()
        .map_err(|_| LedgerError::Config(format!("{} has invalid value '{}'", key, raw)))
}
