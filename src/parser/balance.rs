use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use std::collections::BTreeMap;
use tracing::debug;
use crate::error::Result;
use crate::protocol::ProtocolAddressSet;
use crate::types::{Direction, ExtractQuery, TokenBalance, TokenType, TransferRecord};
use super::{array_at, block_time, meta, parse_err};

/// owner -> amount; a repeated owner keeps its first position and its last amount
type OwnerAmounts = IndexMap<String, Decimal>;

/// Balance-delta extraction: infer an outgoing transfer from the wallet's
/// change in balance.
///
/// Only detects the wallet sending. The recipient is the first owner whose
/// balance grew; fan-out to several recipients is attributed to that one.
pub fn extract_by_balance_delta(
    tx: &Value,
    query: &ExtractQuery,
    protocol: &ProtocolAddressSet,
) -> Result<Option<TransferRecord>> {
    let Some(meta) = meta(tx) else {
        return Ok(None);
    };
    if query.direction == Direction::In {
        return Ok(None);
    }

    let (pre, post) = match query.token_type {
        TokenType::Spl => (
            token_amounts(meta, "preTokenBalances", query.token)?,
            token_amounts(meta, "postTokenBalances", query.token)?,
        ),
        TokenType::Sol => native_amounts(tx, meta, query.wallet)?,
    };

    let Some(&pre_amount) = pre.get(query.wallet) else {
        debug!("Wallet {} has no pre-transaction balance entry", query.wallet);
        return Ok(None);
    };
    let post_amount = post.get(query.wallet).copied().unwrap_or(Decimal::ZERO);
    if post_amount >= pre_amount {
        return Ok(None);
    }

    let recipient = post
        .iter()
        .find(|(owner, amount)| **amount > pre.get(owner.as_str()).copied().unwrap_or(Decimal::ZERO))
        .map(|(owner, _)| owner.clone());
    let Some(recipient) = recipient else {
        debug!("Balance of {} decreased but no recipient found", query.wallet);
        return Ok(None);
    };
    if protocol.contains(&recipient) {
        debug!("Skipping transfer to protocol address {}", recipient);
        return Ok(None);
    }

    Ok(Some(TransferRecord {
        timestamp: block_time(tx),
        from_address: Some(query.wallet.to_string()),
        to_address: Some(recipient),
        token: query.token_label(),
        amount: (post_amount - pre_amount).abs(),
    }))
}

fn token_balances(meta: &Value, field: &str) -> Result<Vec<TokenBalance>> {
    match meta.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => Vec::<TokenBalance>::deserialize(list).map_err(parse_err),
    }
}

fn token_amounts(meta: &Value, field: &str, mint: &str) -> Result<OwnerAmounts> {
    let mut amounts = OwnerAmounts::new();
    for balance in token_balances(meta, field)? {
        if balance.mint != mint {
            continue;
        }
        let Some(owner) = balance.owner else {
            continue;
        };
        let amount = balance.ui_token_amount.ui_amount().map_err(parse_err)?;
        amounts.insert(owner, amount);
    }
    Ok(amounts)
}

/// Lamport balances keyed by account address, in SOL. When the wallet paid
/// the fee, the fee is added back so that fee-only transactions do not
/// look like transfers.
fn native_amounts(tx: &Value, meta: &Value, wallet: &str) -> Result<(OwnerAmounts, OwnerAmounts)> {
    let keys = account_keys(tx)?;
    let pre = lamports(meta, "/preBalances")?;
    let mut post = lamports(meta, "/postBalances")?;
    if keys.len() != pre.len() || keys.len() != post.len() {
        return Err(parse_err(format!(
            "account key count {} does not match balances ({} pre, {} post)",
            keys.len(),
            pre.len(),
            post.len()
        )));
    }

    if keys.first().map(String::as_str) == Some(wallet) {
        let fee = meta.get("fee").and_then(Value::as_u64).unwrap_or(0);
        post[0] = post[0].saturating_add(fee);
    }

    let per_sol = Decimal::from(LAMPORTS_PER_SOL);
    let to_sol = |values: Vec<u64>| -> OwnerAmounts {
        keys.iter()
            .cloned()
            .zip(values)
            .map(|(key, lamports)| (key, Decimal::from(lamports) / per_sol))
            .collect()
    };
    Ok((to_sol(pre), to_sol(post)))
}

/// `jsonParsed` renders keys as `{pubkey, signer, writable}`, `json` as plain strings.
fn account_keys(tx: &Value) -> Result<Vec<String>> {
    array_at(tx, "/transaction/message/accountKeys")?
        .iter()
        .map(|key| {
            key.as_str()
                .or_else(|| key.get("pubkey").and_then(Value::as_str))
                .map(str::to_string)
                .ok_or_else(|| parse_err("malformed account key"))
        })
        .collect()
}

fn lamports(meta: &Value, pointer: &str) -> Result<Vec<u64>> {
    array_at(meta, pointer)?
        .iter()
        .map(|v| v.as_u64().ok_or_else(|| parse_err(format!("non-integer entry in {}", pointer))))
        .collect()
}

/// Token balance change of one account within a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub account_index: u64,
    pub owner: Option<String>,
    pub mint: String,
    pub pre: Decimal,
    pub post: Decimal,
    pub change: Decimal,
}

/// Every token account whose amount changed, ordered by account index.
/// Accounts missing from one side count as zero on that side.
pub fn balance_changes(tx: &Value) -> Result<Vec<BalanceChange>> {
    let Some(meta) = meta(tx) else {
        return Ok(Vec::new());
    };

    let mut by_index: BTreeMap<u64, (Option<TokenBalance>, Option<TokenBalance>)> = BTreeMap::new();
    for balance in token_balances(meta, "preTokenBalances")? {
        let index = balance.account_index;
        by_index.entry(index).or_default().0 = Some(balance);
    }
    for balance in token_balances(meta, "postTokenBalances")? {
        let index = balance.account_index;
        by_index.entry(index).or_default().1 = Some(balance);
    }

    let mut changes = Vec::new();
    for (account_index, (pre, post)) in by_index {
        let amount = |b: &Option<TokenBalance>| -> Result<Decimal> {
            match b {
                Some(b) => b.ui_token_amount.ui_amount().map_err(parse_err),
                None => Ok(Decimal::ZERO),
            }
        };
        let pre_amount = amount(&pre)?;
        let post_amount = amount(&post)?;
        if pre_amount == post_amount {
            continue;
        }
        let Some(snapshot) = post.or(pre) else {
            continue;
        };
        changes.push(BalanceChange {
            account_index,
            owner: snapshot.owner,
            mint: snapshot.mint,
            pre: pre_amount,
            post: post_amount,
            change: post_amount - pre_amount,
        });
    }
    Ok(changes)
}
