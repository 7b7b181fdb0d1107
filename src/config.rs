use serde::de::DeserializeOwned;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use crate::address::{TOKEN_ADDRESSES, WALLET_ADDRESSES};
use crate::error::{Result, TrackerError};
use crate::logging::LogSettings;
use crate::protocol::ProtocolAddressSet;
use crate::rpc::RpcSettings;
use crate::tracker::TrackerSettings;

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc: RpcSettings,
    pub tracker: TrackerSettings,
    pub logging: LogSettings,
    /// Extra protocol addresses from `FILTER_ADDRESSES`.
    pub filter_addresses: Vec<String>,
    pub wallet_addresses: Vec<String>,
    pub token_addresses: Vec<String>,
}

impl Config {
    /// 读取 .env 与环境变量
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = TrackerSettings::default();

        let url = vars
            .raw("QUICKNODE_RPC_URL")
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        if url.trim().is_empty() {
            return Err(TrackerError::Config("missing QUICKNODE_RPC_URL".to_string()));
        }

        let rpc = RpcSettings {
            url: url.trim().to_string(),
            api_key: vars.non_empty("QUICKNODE_API_KEY"),
            use_proxy: vars.flag("USE_PROXY", false)?,
            http_proxy: vars.non_empty("HTTP_PROXY"),
            https_proxy: vars.non_empty("HTTPS_PROXY"),
        };

        let commitment = vars
            .parsed::<CommitmentLevel>("COMMITMENT")?
            .map(|commitment| CommitmentConfig { commitment });

        let tracker = TrackerSettings {
            signature_limit: vars.parse_or("SIGNATURE_LIMIT", defaults.signature_limit)?,
            max_transactions: vars.parse_or("MAX_TRANSACTIONS", defaults.max_transactions)?,
            batch_size: vars.parse_or("BATCH_SIZE", defaults.batch_size)?,
            exclude_failed: vars.flag("EXCLUDE_FAILED", defaults.exclude_failed)?,
            commitment,
            strategy: vars.parse_or("STRATEGY", defaults.strategy)?,
            direction: vars.parse_or("DIRECTION", defaults.direction)?,
            token_type: vars.parse_or("TOKEN_TYPE", defaults.token_type)?,
            include_inner: vars.flag("INCLUDE_INNER_INSTRUCTIONS", defaults.include_inner)?,
            cache_capacity: vars.parse_or("CACHE_CAPACITY", defaults.cache_capacity)?,
            output_dir: vars
                .non_empty("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            dump_raw: vars.flag("DUMP_RAW_TRANSACTIONS", defaults.dump_raw)?,
        };
        if tracker.batch_size == 0 {
            return Err(TrackerError::Config("BATCH_SIZE must be positive".to_string()));
        }

        let log_defaults = LogSettings::default();
        let logging = LogSettings {
            level: vars.non_empty("LOG_LEVEL").unwrap_or(log_defaults.level),
            file: vars.non_empty("LOG_FILE").map(PathBuf::from).or(log_defaults.file),
        };

        Ok(Config {
            rpc,
            tracker,
            logging,
            filter_addresses: vars.json("FILTER_ADDRESSES")?.unwrap_or_default(),
            wallet_addresses: vars
                .json("WALLET_ADDRESSES")?
                .unwrap_or_else(|| to_strings(WALLET_ADDRESSES)),
            token_addresses: vars
                .json("TOKEN_ADDRESSES")?
                .unwrap_or_else(|| to_strings(TOKEN_ADDRESSES)),
        })
    }

    /// Built-in protocol addresses plus `FILTER_ADDRESSES`.
    pub fn protocol_addresses(&self) -> ProtocolAddressSet {
        let mut set = ProtocolAddressSet::builtin();
        set.extend(self.filter_addresses.iter().cloned());
        set
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.raw(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.non_empty(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|e| TrackerError::Config(format!("invalid {} '{}': {}", key, v, e)))
            })
            .transpose()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.parsed(key)?.unwrap_or(default))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.non_empty(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(TrackerError::Config(format!("invalid {} '{}', expected true/false", key, v))),
            },
        }
    }

    fn json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.non_empty(key)
            .map(|v| {
                serde_json::from_str(&v)
                    .map_err(|e| TrackerError::Config(format!("invalid JSON in {}: {}", key, e)))
            })
            .transpose()
    }
}

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
