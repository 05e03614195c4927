//! Chain Executor
//!
//! Balance reads and ERC-20 transfers on an EVM chain. Every anticipated
//! failure of a transfer comes back as a typed [`TransferError`]; validation
//! of the recipient, the amount and the key happens before any network call.

pub mod erc20;
pub mod rpc;
pub mod tx_log;

pub use rpc::EvmRpc;
pub use tx_log::TxLog;

use crate::config::ChainConfig;
use crate::wallet::local_wallet;
use async_trait::async_trait;
use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, U256};
use ethers::utils::{format_ether, format_units, parse_units, to_checksum};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::OnceCell;

/// Used when gas estimation fails
const FALLBACK_GAS_LIMIT: u64 = 100_000;
/// 5 gwei, used when the node does not report a gas price
const FALLBACK_GAS_PRICE_WEI: u64 = 5_000_000_000;
const FALLBACK_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBalance {
    pub address: String,
    pub native: String,
    pub token: String,
    pub native_symbol: String,
    pub token_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid recipient address")]
    InvalidAddress,
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("No private key provided")]
    MissingKey,
    #[error("Invalid private key")]
    InvalidKey,
    #[error("Amount parse error")]
    AmountParse,
    #[error("Insufficient {0} balance")]
    InsufficientTokenBalance(String),
    #[error("Insufficient {0} for gas")]
    InsufficientGas(String),
    #[error("{0}")]
    Rpc(String),
    #[error("{0}")]
    Submission(String),
}

/// Balance and transfer execution against the token ledger
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    /// Native and token balance of the wallet behind `secret_key`
    async fn get_balance(&self, secret_key: &str) -> Result<WalletBalance, String>;

    /// Send `amount` whole tokens to `to`
    async fn transfer(
        &self,
        secret_key: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, TransferError>;

    fn token_symbol(&self) -> &str;

    fn native_symbol(&self) -> &str;
}

/// Recipient must be a 0x-prefixed 20-byte hex address; mixed case must be a
/// valid checksum.
pub fn parse_address(raw: &str) -> Option<Address> {
    let raw = raw.trim();
    let body = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let address: Address = body.parse().ok()?;

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None) != format!("0x{}", body) {
        return None;
    }
    Some(address)
}

/// ERC-20 executor talking to a JSON-RPC node
pub struct TokenExecutor {
    rpc: EvmRpc,
    token: Address,
    token_symbol: String,
    native_symbol: String,
    explorer_tx_url: String,
    tx_log: TxLog,
    decimals: OnceCell<u32>,
    chain_id: OnceCell<u64>,
}

impl TokenExecutor {
    pub fn new(config: &ChainConfig) -> Result<Self, String> {
        let token: Address = config
            .token_address
            .trim()
            .parse()
            .map_err(|_| format!("Invalid token contract address: {}", config.token_address))?;

        Ok(Self {
            rpc: EvmRpc::new(&config.rpc_url)?,
            token,
            token_symbol: config.token_symbol.clone(),
            native_symbol: config.native_symbol.clone(),
            explorer_tx_url: config.explorer_tx_url.clone(),
            tx_log: TxLog::new(config.log_file.clone()),
            decimals: OnceCell::new(),
            chain_id: OnceCell::new(),
        })
    }

    /// Token decimals, read once. Falls back to 18 if the contract call fails.
    async fn decimals(&self) -> u32 {
        *self
            .decimals
            .get_or_init(|| async {
                let result = self
                    .rpc
                    .eth_call(self.token, &erc20::decimals_calldata())
                    .await
                    .and_then(|bytes| erc20::decode_uint(&bytes));
                match result {
                    Ok(value) => value.low_u32(),
                    Err(e) => {
                        log::warn!("[CHAIN] decimals() failed, assuming {}: {}", FALLBACK_DECIMALS, e);
                        FALLBACK_DECIMALS
                    }
                }
            })
            .await
    }

    async fn chain_id(&self) -> Result<u64, String> {
        self.chain_id
            .get_or_try_init(|| self.rpc.chain_id())
            .await
            .copied()
    }

    async fn token_balance(&self, owner: Address) -> Result<U256, String> {
        let bytes = self
            .rpc
            .eth_call(self.token, &erc20::balance_of_calldata(owner))
            .await?;
        erc20::decode_uint(&bytes)
    }

    fn fail(&self, entry: serde_json::Value, error: TransferError) -> TransferError {
        let mut entry = entry;
        entry["result"] = json!({ "ok": false, "error": error.to_string() });
        self.tx_log.append(entry);
        error
    }
}

#[async_trait]
impl ChainExecutor for TokenExecutor {
    async fn get_balance(&self, secret_key: &str) -> Result<WalletBalance, String> {
        if secret_key.trim().is_empty() {
            return Err("Private key required for balance check".to_string());
        }
        let wallet = local_wallet(secret_key)?;
        let owner = wallet.address();

        let (native, token, decimals) = tokio::try_join!(
            self.rpc.get_balance(owner),
            self.token_balance(owner),
            async { Ok::<u32, String>(self.decimals().await) },
        )?;

        Ok(WalletBalance {
            address: to_checksum(&owner, None),
            native: format_ether(native),
            token: format_units(token, decimals).map_err(|e| format!("Failed to format balance: {}", e))?,
            native_symbol: self.native_symbol.clone(),
            token_symbol: self.token_symbol.clone(),
        })
    }

    async fn transfer(
        &self,
        secret_key: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, TransferError> {
        let recipient = match parse_address(to) {
            Some(address) => address,
            None => {
                return Err(self.fail(
                    json!({ "action": "validate", "to": to, "amount": amount.to_string() }),
                    TransferError::InvalidAddress,
                ))
            }
        };
        if amount <= Decimal::ZERO {
            return Err(self.fail(
                json!({ "action": "validate", "to": to, "amount": amount.to_string() }),
                TransferError::InvalidAmount,
            ));
        }
        if secret_key.trim().is_empty() {
            return Err(TransferError::MissingKey);
        }
        let wallet = local_wallet(secret_key).map_err(|_| TransferError::InvalidKey)?;
        let sender = wallet.address();
        let sender_str = to_checksum(&sender, None);

        let decimals = self.decimals().await;
        let value: U256 = match parse_units(amount.normalize().to_string(), decimals) {
            Ok(units) => units.into(),
            Err(e) => {
                return Err(self.fail(
                    json!({ "action": "parse", "to": to, "amount": amount.to_string(), "error": e.to_string() }),
                    TransferError::AmountParse,
                ))
            }
        };

        let balance = self.token_balance(sender).await.map_err(TransferError::Rpc)?;
        if balance < value {
            return Err(self.fail(
                json!({
                    "action": "balance_check",
                    "sender": sender_str,
                    "to": to,
                    "amount": amount.to_string(),
                    "balance": balance.to_string()
                }),
                TransferError::InsufficientTokenBalance(self.token_symbol.clone()),
            ));
        }

        let calldata = erc20::transfer_calldata(recipient, value);
        let native_balance = self.rpc.get_balance(sender).await.map_err(TransferError::Rpc)?;
        let gas_limit = match self.rpc.estimate_gas(sender, self.token, &calldata, U256::zero()).await {
            Ok(gas) => gas,
            Err(e) => {
                log::warn!("[CHAIN] Gas estimation failed, using {}: {}", FALLBACK_GAS_LIMIT, e);
                U256::from(FALLBACK_GAS_LIMIT)
            }
        };
        let gas_price = self
            .rpc
            .gas_price()
            .await
            .unwrap_or_else(|_| U256::from(FALLBACK_GAS_PRICE_WEI));
        let gas_cost = gas_limit * gas_price;

        if native_balance < gas_cost {
            return Err(self.fail(
                json!({
                    "action": "gas_check",
                    "sender": sender_str,
                    "to": to,
                    "amount": amount.to_string(),
                    "nativeBalance": native_balance.to_string(),
                    "gasEstimate": gas_limit.to_string(),
                    "gasPrice": gas_price.to_string(),
                    "gasCost": gas_cost.to_string()
                }),
                TransferError::InsufficientGas(self.native_symbol.clone()),
            ));
        }

        let submitted: Result<String, String> = async {
            let chain_id = self.chain_id().await?;
            let nonce = self.rpc.get_transaction_count(sender).await?;

            let tx = TransactionRequest::new()
                .from(sender)
                .to(self.token)
                .data(calldata.clone())
                .nonce(nonce)
                .gas(gas_limit)
                .gas_price(gas_price)
                .chain_id(chain_id);

            let typed_tx: TypedTransaction = tx.into();
            let signature = wallet
                .with_chain_id(chain_id)
                .sign_transaction(&typed_tx)
                .await
                .map_err(|e| format!("Failed to sign transaction: {}", e))?;

            let signed_tx = typed_tx.rlp_signed(&signature);
            let tx_hash = self.rpc.send_raw_transaction(&signed_tx).await?;
            Ok(format!("{:?}", tx_hash))
        }
        .await;

        match submitted {
            Ok(tx_hash) => {
                log::info!("[CHAIN] Sent {} {} to {:?}: {}", amount, self.token_symbol, recipient, tx_hash);
                self.tx_log.append(json!({
                    "action": "send",
                    "sender": sender_str,
                    "to": to,
                    "amount": amount.to_string(),
                    "txHash": tx_hash
                }));
                Ok(TransferReceipt {
                    explorer_url: format!("{}{}", self.explorer_tx_url, tx_hash),
                    tx_hash,
                })
            }
            Err(e) => {
                log::error!("[CHAIN] Send error: {}", e);
                self.tx_log.append(json!({
                    "action": "send_error",
                    "sender": sender_str,
                    "to": to,
                    "amount": amount.to_string(),
                    "error": e
                }));
                Err(TransferError::Submission(e))
            }
        }
    }

    fn token_symbol(&self) -> &str {
        &self.token_symbol
    }

    fn native_symbol(&self) -> &str {
        &self.native_symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn offline_executor(log_file: PathBuf) -> TokenExecutor {
        TokenExecutor::new(&ChainConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            token_address: "0x55d398326f99059fF775485246999027B3197955".to_string(),
            explorer_tx_url: "https://bscscan.com/tx/".to_string(),
            token_symbol: "USDT".to_string(),
            native_symbol: "BNB".to_string(),
            log_file,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address(RECIPIENT).is_some());
        assert!(parse_address(&RECIPIENT.to_lowercase()).is_some());
        assert!(parse_address("0x70997970c51812dc3a010c7d01b50e0d17dc79").is_none());
        assert!(parse_address("70997970C51812dc3A010C7d01b50e0d17dc79C8").is_none());
        assert!(parse_address("0xABC").is_none());
        // bad checksum
        assert!(parse_address("0x70997970c51812DC3A010C7d01b50e0d17dc79C8").is_none());
    }

    #[test]
    fn test_transfer_error_messages() {
        assert_eq!(TransferError::InsufficientTokenBalance("USDT".into()).to_string(), "Insufficient USDT balance");
        assert_eq!(TransferError::InsufficientGas("BNB".into()).to_string(), "Insufficient BNB for gas");
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_file = dir.path().join("transactions.log");
        let executor = offline_executor(log_file.clone());

        let err = executor.transfer(TEST_KEY, "0xABC", Decimal::from(5)).await.unwrap_err();
        assert_eq!(err, TransferError::InvalidAddress);

        let err = executor.transfer(TEST_KEY, RECIPIENT, Decimal::ZERO).await.unwrap_err();
        assert_eq!(err, TransferError::InvalidAmount);

        let err = executor.transfer("", RECIPIENT, Decimal::ONE).await.unwrap_err();
        assert_eq!(err, TransferError::MissingKey);

        let err = executor.transfer("0x1234", RECIPIENT, Decimal::ONE).await.unwrap_err();
        assert_eq!(err, TransferError::InvalidKey);

        let content = std::fs::read_to_string(&log_file).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Invalid recipient address"));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_rpc_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let executor = offline_executor(dir.path().join("transactions.log"));

        let err = executor.transfer(TEST_KEY, RECIPIENT, Decimal::ONE).await.unwrap_err();
        assert!(matches!(err, TransferError::Rpc(_)));
        assert!(executor.get_balance(TEST_KEY).await.is_err());
    }
}
