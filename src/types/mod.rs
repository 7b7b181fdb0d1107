use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 原生SOL转账在记录中的代币标记
pub const NATIVE_SOL: &str = "SOL";

pub const SPL_TOKEN_PROGRAM: &str = "spl-token";
pub const SYSTEM_PROGRAM: &str = "system";

/// One exported transfer row. Column order follows field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    pub timestamp: Option<i64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub token: String,
    pub amount: Decimal,
}

impl TransferRecord {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
    All,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "all" => Ok(Direction::All),
            other => Err(format!("unknown direction '{}', expected in/out/all", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Spl,
    Sol,
}

impl TokenType {
    /// Program name reported by `jsonParsed` instructions for this kind of transfer.
    pub fn program(self) -> &'static str {
        match self {
            TokenType::Spl => SPL_TOKEN_PROGRAM,
            TokenType::Sol => SYSTEM_PROGRAM,
        }
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spl" => Ok(TokenType::Spl),
            "sol" => Ok(TokenType::Sol),
            other => Err(format!("unknown token type '{}', expected spl/sol", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Instruction,
    BalanceDelta,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instruction" => Ok(Strategy::Instruction),
            "balance" | "balance_delta" => Ok(Strategy::BalanceDelta),
            other => Err(format!(
                "unknown strategy '{}', expected instruction/balance",
                other
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Instruction => write!(f, "instruction"),
            Strategy::BalanceDelta => write!(f, "balance"),
        }
    }
}

/// What a single extraction pass is looking for.
#[derive(Debug, Clone, Copy)]
pub struct ExtractQuery<'a> {
    pub wallet: &'a str,
    pub token: &'a str,
    pub direction: Direction,
    pub token_type: TokenType,
    pub include_inner: bool,
}

impl<'a> ExtractQuery<'a> {
    pub fn new(wallet: &'a str, token: &'a str) -> Self {
        ExtractQuery {
            wallet,
            token,
            direction: Direction::All,
            token_type: TokenType::Spl,
            include_inner: false,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    pub fn include_inner(mut self, include_inner: bool) -> Self {
        self.include_inner = include_inner;
        self
    }

    /// Value written to the `token` column.
    pub fn token_label(&self) -> String {
        match self.token_type {
            TokenType::Spl => self.token.to_string(),
            TokenType::Sol => NATIVE_SOL.to_string(),
        }
    }
}

// RPC jsonParsed 视图，只读取需要的字段

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u64,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    #[serde(default)]
    pub ui_amount_string: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

impl UiTokenAmount {
    /// Human-readable amount; a missing or empty string counts as zero.
    pub fn ui_amount(&self) -> Result<Decimal, String> {
        parse_amount(self.ui_amount_string.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub parsed: Option<Value>,
}

impl ParsedInstruction {
    pub fn instruction_type(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("type")?.as_str()
    }

    pub fn info(&self) -> Option<&Value> {
        self.parsed.as_ref()?.get("info")
    }
}

/// `parsed.info` of a token-program or system-program transfer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInfo {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token_amount: Option<UiTokenAmount>,
    #[serde(default)]
    pub lamports: Option<u64>,
}

/// Parses a node-rendered amount string exactly. Missing or empty is zero.
pub(crate) fn parse_amount(raw: Option<&str>) -> Result<Decimal, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Decimal::ZERO),
        Some(s) => Decimal::from_str_exact(s)
            .map_err(|e| format!("invalid amount '{}': {}", s, e)),
    }
}
