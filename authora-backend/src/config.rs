use std::env;
use std::path::PathBuf;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const BOT_TOKEN: &str = "BOT_TOKEN";
    pub const TELEGRAM_USER_ID: &str = "TELEGRAM_USER_ID";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const OPENAI_ENDPOINT: &str = "OPENAI_ENDPOINT";
    pub const RPC_URL: &str = "BSC_RPC_URL";
    pub const TOKEN_CONTRACT_ADDRESS: &str = "USDT_CONTRACT_ADDRESS";
    pub const EXPLORER_TX_URL: &str = "EXPLORER_TX_URL";
    pub const TOKEN_SYMBOL: &str = "TOKEN_SYMBOL";
    pub const NATIVE_SYMBOL: &str = "NATIVE_SYMBOL";
    pub const CONTACTS_FILE: &str = "CONTACTS_FILE";
    pub const LOG_FILE: &str = "LOG_FILE";
    pub const PORT: &str = "PORT";
}

/// Default values
pub mod defaults {
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub const RPC_URL: &str = "https://bsc-dataseed.binance.org/";
    pub const TOKEN_CONTRACT_ADDRESS: &str = "0x55d398326f99059fF775485246999027B3197955";
    pub const EXPLORER_TX_URL: &str = "https://bscscan.com/tx/";
    pub const TOKEN_SYMBOL: &str = "USDT";
    pub const NATIVE_SYMBOL: &str = "BNB";
    pub const CONTACTS_FILE: &str = "contacts.json";
    pub const LOG_FILE: &str = "logs/transactions.log";
    pub const PORT: u16 = 4000;
}

/// Language model settings. Absent when no API key is configured, in which
/// case the intent parser runs on its pattern rules only.
#[derive(Clone, Debug)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

/// Token contract and RPC settings used by the chain executor
#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub token_address: String,
    pub explorer_tx_url: String,
    pub token_symbol: String,
    pub native_symbol: String,
    pub log_file: PathBuf,
}

impl ChainConfig {
    pub fn from_env() -> Self {
        Self {
            rpc_url: env_or(env_vars::RPC_URL, defaults::RPC_URL),
            token_address: env_or(env_vars::TOKEN_CONTRACT_ADDRESS, defaults::TOKEN_CONTRACT_ADDRESS),
            explorer_tx_url: env_or(env_vars::EXPLORER_TX_URL, defaults::EXPLORER_TX_URL),
            token_symbol: env_or(env_vars::TOKEN_SYMBOL, defaults::TOKEN_SYMBOL),
            native_symbol: env_or(env_vars::NATIVE_SYMBOL, defaults::NATIVE_SYMBOL),
            log_file: PathBuf::from(env_or(env_vars::LOG_FILE, defaults::LOG_FILE)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// Telegram user id of the only operator allowed to talk to the bot
    pub owner_id: u64,
    pub ai: Option<AiConfig>,
    pub chain: ChainConfig,
    pub contacts_file: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let bot_token = env::var(env_vars::BOT_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| format!("{} is missing in environment", env_vars::BOT_TOKEN))?;

        let owner_id = env::var(env_vars::TELEGRAM_USER_ID)
            .map_err(|_| format!("{} is missing in environment", env_vars::TELEGRAM_USER_ID))?
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("{} must be a numeric user id: {}", env_vars::TELEGRAM_USER_ID, e))?;

        let ai = env::var(env_vars::OPENAI_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| AiConfig {
                api_key,
                model: env_or(env_vars::OPENAI_MODEL, defaults::OPENAI_MODEL),
                endpoint: env_or(env_vars::OPENAI_ENDPOINT, defaults::OPENAI_ENDPOINT),
            });

        let port = match env::var(env_vars::PORT) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| format!("{} must be a valid number, got '{}'", env_vars::PORT, raw))?,
            Err(_) => defaults::PORT,
        };

        Ok(Self {
            bot_token,
            owner_id,
            ai,
            chain: ChainConfig::from_env(),
            contacts_file: PathBuf::from(env_or(env_vars::CONTACTS_FILE, defaults::CONTACTS_FILE)),
            port,
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
