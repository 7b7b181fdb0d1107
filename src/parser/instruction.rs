use serde::Deserialize;
use serde_json::Value;
use rust_decimal::Decimal;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use tracing::debug;
use crate::error::Result;
use crate::protocol::ProtocolAddressSet;
use crate::types::{
    parse_amount, Direction, ExtractQuery, ParsedInstruction, TokenType, TransferInfo,
    TransferRecord,
};
use super::{array_at, block_time, meta, parse_err};

const TRANSFER_TYPES: [&str; 2] = ["transfer", "transferChecked"];

/// Instruction-based extraction: read the transfer straight out of the
/// parsed instruction list.
///
/// Top-level instructions are scanned first, then inner instructions when
/// `query.include_inner` is set. The first qualifying instruction wins;
/// further transfers in the same transaction are not aggregated.
///
/// `source` and `destination` are compared to the wallet as-is. For SPL
/// transfers the node reports token accounts there and the wallet only as
/// `authority`, so a wallet address matches only when it is itself the
/// token account.
pub fn extract_by_instruction(
    tx: &Value,
    query: &ExtractQuery,
    protocol: &ProtocolAddressSet,
) -> Result<Option<TransferRecord>> {
    let Some(meta) = meta(tx) else {
        return Ok(None);
    };

    let top_level = array_at(tx, "/transaction/message/instructions")?;
    let inner: Vec<&Value> = if query.include_inner {
        inner_instructions(meta)?
    } else {
        Vec::new()
    };

    for raw in top_level.iter().chain(inner) {
        let ix = ParsedInstruction::deserialize(raw).map_err(parse_err)?;

        if ix.program.as_deref() != Some(query.token_type.program()) {
            continue;
        }
        match ix.instruction_type() {
            Some(kind) if TRANSFER_TYPES.contains(&kind) => {}
            _ => continue,
        }
        let Some(info) = ix.info() else {
            continue;
        };
        let info = TransferInfo::deserialize(info).map_err(parse_err)?;

        if query.token_type == TokenType::Spl && info.mint.as_deref() != Some(query.token) {
            continue;
        }
        if !direction_matches(&info, query) {
            continue;
        }
        if protocol.contains_opt(info.source.as_deref())
            || protocol.contains_opt(info.destination.as_deref())
        {
            debug!(
                "Skipping transfer {:?} -> {:?}: protocol address",
                info.source, info.destination
            );
            continue;
        }

        let amount = instruction_amount(&info, query.token_type)?;
        return Ok(Some(TransferRecord {
            timestamp: block_time(tx),
            from_address: info.source,
            to_address: info.destination,
            token: query.token_label(),
            amount,
        }));
    }

    Ok(None)
}

fn direction_matches(info: &TransferInfo, query: &ExtractQuery) -> bool {
    match query.direction {
        Direction::In => info.destination.as_deref() == Some(query.wallet),
        Direction::Out => info.source.as_deref() == Some(query.wallet),
        Direction::All => true,
    }
}

fn instruction_amount(info: &TransferInfo, token_type: TokenType) -> Result<Decimal> {
    match token_type {
        TokenType::Spl => {
            let ui = info
                .token_amount
                .as_ref()
                .and_then(|t| t.ui_amount_string.as_deref())
                .or(info.amount.as_deref());
            parse_amount(ui).map_err(parse_err)
        }
        TokenType::Sol => {
            let lamports = info
                .lamports
                .ok_or_else(|| parse_err("system transfer without lamports"))?;
            Ok(Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL))
        }
    }
}

fn inner_instructions(meta: &Value) -> Result<Vec<&Value>> {
    let groups = match meta.get("innerInstructions") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(groups) => groups
            .as_array()
            .ok_or_else(|| parse_err("innerInstructions is not an array"))?,
    };
    let mut out = Vec::new();
    for group in groups {
        out.extend(array_at(group, "/instructions")?.iter());
    }
    Ok(out)
}
