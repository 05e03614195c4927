//! Wallet Registry
//!
//! Maps friendly wallet names ("Main Ops", "Reserve", ...) to secret keys.
//! Keys come from environment variables, one variable per wallet. Only wallets
//! whose variable is set are enumerated; enumeration order is the order of
//! `WALLET_ENV_MAP`, and the first entry is the default source wallet.

mod signer;

pub use signer::{derive_address, local_wallet};

use std::env;

/// Friendly name -> environment variable holding that wallet's private key
pub const WALLET_ENV_MAP: &[(&str, &str)] = &[
    ("Main Ops", "WALLET_MAIN_OPS"),
    ("Reserve", "WALLET_RESERVE"),
    ("Ritika", "WALLET_RITIKA"),
    ("Farzi", "WALLET_FARZI"),
    ("Princess", "WALLET_PRINCESS"),
    ("Default", "PRIVATE_KEY"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet '{0}' not found or key not set in environment variables.")]
    NotFound(String),
}

#[derive(Debug, Clone)]
struct WalletEntry {
    name: String,
    secret_key: String,
}

/// Read-only registry of configured wallets
#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    entries: Vec<WalletEntry>,
}

impl WalletRegistry {
    /// Load every wallet from `WALLET_ENV_MAP` whose variable is set
    pub fn from_env() -> Self {
        let entries = WALLET_ENV_MAP
            .iter()
            .filter_map(|(name, var)| {
                env::var(var)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .map(|secret_key| WalletEntry {
                        name: name.to_string(),
                        secret_key,
                    })
            })
            .collect();
        Self { entries }
    }

    /// Build a registry from explicit (name, secret) pairs, keeping their order
    pub fn from_entries<N: Into<String>, K: Into<String>>(entries: Vec<(N, K)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, key)| WalletEntry {
                    name: name.into(),
                    secret_key: key.into(),
                })
                .collect(),
        }
    }

    /// Secret key for a friendly name (case-insensitive)
    pub fn resolve(&self, friendly_name: &str) -> Result<&str, WalletError> {
        let wanted = friendly_name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
            .map(|e| e.secret_key.as_str())
            .ok_or_else(|| WalletError::NotFound(friendly_name.to_string()))
    }

    /// Configured wallet names in enumeration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Default source wallet (first configured)
    pub fn default_name(&self) -> Option<&str> {
        self.entries.first().map(|e| e.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> WalletRegistry {
        WalletRegistry::from_entries(vec![("Main Ops", "0xaaa"), ("Reserve", "0xbbb")])
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let wallets = registry();
        assert_eq!(wallets.resolve("reserve").unwrap(), "0xbbb");
        assert_eq!(wallets.resolve("MAIN OPS").unwrap(), "0xaaa");
    }

    #[test]
    fn test_resolve_unknown_wallet() {
        let err = registry().resolve("Savings").unwrap_err();
        assert_eq!(err, WalletError::NotFound("Savings".to_string()));
    }

    #[test]
    fn test_names_keep_order() {
        let wallets = registry();
        assert_eq!(wallets.names(), vec!["Main Ops", "Reserve"]);
        assert_eq!(wallets.default_name(), Some("Main Ops"));
    }

    #[test]
    fn test_empty_registry_has_no_default() {
        let wallets = WalletRegistry::default();
        assert!(wallets.is_empty());
        assert_eq!(wallets.default_name(), None);
    }
}
