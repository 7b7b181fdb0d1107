pub mod balance;
pub mod instruction;

use serde_json::Value;
use tracing::{debug, warn};
use crate::error::{Result, TrackerError};
use crate::protocol::ProtocolAddressSet;
use crate::types::{ExtractQuery, Strategy, TransferRecord};

pub use balance::{balance_changes, extract_by_balance_delta, BalanceChange};
pub use instruction::extract_by_instruction;

/// Turns raw `getTransaction` results into transfer records.
///
/// The two strategies are independent and never reconciled here: a caller
/// that wants both runs `parse_transaction` once per strategy.
pub struct TransactionParser {
    protocol: ProtocolAddressSet,
}

impl TransactionParser {
    pub fn new(protocol: ProtocolAddressSet) -> Self {
        TransactionParser { protocol }
    }

    pub fn protocol(&self) -> &ProtocolAddressSet {
        &self.protocol
    }

    /// Shape errors are logged and reported as "no record".
    pub fn parse_transaction(
        &self,
        tx: &Value,
        query: &ExtractQuery,
        strategy: Strategy,
    ) -> Option<TransferRecord> {
        match extract(strategy, tx, query, &self.protocol) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Failed to parse transaction {}: {}",
                    signature_of(tx).unwrap_or("<unknown>"),
                    e
                );
                None
            }
        }
    }
}

pub fn extract(
    strategy: Strategy,
    tx: &Value,
    query: &ExtractQuery,
    protocol: &ProtocolAddressSet,
) -> Result<Option<TransferRecord>> {
    match strategy {
        Strategy::Instruction => extract_by_instruction(tx, query, protocol),
        Strategy::BalanceDelta => extract_by_balance_delta(tx, query, protocol),
    }
}

/// 交易元数据；缺失或为 null 时返回 None
pub(crate) fn meta(tx: &Value) -> Option<&Value> {
    match tx.get("meta") {
        Some(Value::Null) | None => {
            debug!("Transaction has no meta block, skipping");
            None
        }
        Some(meta) => Some(meta),
    }
}

pub(crate) fn block_time(tx: &Value) -> Option<i64> {
    tx.get("blockTime").and_then(Value::as_i64)
}

pub fn signature_of(tx: &Value) -> Option<&str> {
    tx.pointer("/transaction/signatures/0").and_then(Value::as_str)
}

pub(crate) fn array_at<'a>(value: &'a Value, pointer: &str) -> Result<&'a Vec<Value>> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| TrackerError::Parse(format!("missing or non-array field {}", pointer)))
}

pub(crate) fn parse_err(e: impl std::fmt::Display) -> TrackerError {
    TrackerError::Parse(e.to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::str::FromStr;

    pub const WALLET: &str = "CuwxHwz42cNivJqWGBk6HcVvfGq47868Mo6zi4u6z9vC";
    pub const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    pub const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    pub const POOL: &str = "PoolAddress1111111111111111111111111111111";
    pub const WALLET_TOKEN_ACCOUNT: &str = "7UX2i7SucgLMQcfZ75s3VXmZZY4YRUyJN9X1RgfMoDUi";
    pub const RECIPIENT_TOKEN_ACCOUNT: &str = "3emsAVdmGKERbHjmGfQ6oZ1e35dkf5iYcS6U4CPKFVaa";

    pub fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub fn token_balance(index: u64, owner: &str, mint: &str, ui: &str) -> Value {
        json!({
            "accountIndex": index,
            "mint": mint,
            "owner": owner,
            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "uiTokenAmount": {
                "amount": "0",
                "decimals": 6,
                "uiAmount": null,
                "uiAmountString": ui
            }
        })
    }

    /// transferChecked where the owner signs for its own address as the source.
    pub fn spl_transfer(source: &str, destination: &str, mint: &str, ui: &str) -> Value {
        spl_transfer_checked(source, source, destination, mint, ui)
    }

    pub fn spl_transfer_checked(
        authority: &str,
        source: &str,
        destination: &str,
        mint: &str,
        ui: &str,
    ) -> Value {
        json!({
            "program": "spl-token",
            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "parsed": {
                "type": "transferChecked",
                "info": {
                    "authority": authority,
                    "source": source,
                    "destination": destination,
                    "mint": mint,
                    "tokenAmount": {
                        "amount": "0",
                        "decimals": 6,
                        "uiAmountString": ui
                    }
                }
            },
            "stackHeight": null
        })
    }

    pub fn system_transfer(source: &str, destination: &str, lamports: u64) -> Value {
        json!({
            "program": "system",
            "programId": "11111111111111111111111111111111",
            "parsed": {
                "type": "transfer",
                "info": {
                    "source": source,
                    "destination": destination,
                    "lamports": lamports
                }
            }
        })
    }

    pub fn transaction(instructions: Vec<Value>, pre: Vec<Value>, post: Vec<Value>) -> Value {
        json!({
            "blockTime": 1_700_000_000,
            "slot": 250_000_000,
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [],
                "postBalances": [],
                "preTokenBalances": pre,
                "postTokenBalances": post,
                "innerInstructions": []
            },
            "transaction": {
                "signatures": ["5sigFixture"],
                "message": {
                    "accountKeys": [],
                    "instructions": instructions
                }
            }
        })
    }
}
