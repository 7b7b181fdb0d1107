use serde_json::Value;
use solana_client::rpc_config::RpcSignaturesForAddressConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use crate::address::is_valid_solana_address;
use crate::batch::batch;
use crate::cache::TransactionCache;
use crate::error::{Result, TrackerError};
use crate::parser::TransactionParser;
use crate::report::{self, TransferTable};
use crate::rpc::SolanaRpc;
use crate::types::{Direction, ExtractQuery, Strategy, TokenType};

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Page size for `getSignaturesForAddress`; only the first page is read.
    pub signature_limit: usize,
    pub max_transactions: usize,
    pub batch_size: usize,
    pub exclude_failed: bool,
    pub commitment: Option<CommitmentConfig>,
    pub strategy: Strategy,
    pub direction: Direction,
    pub token_type: TokenType,
    pub include_inner: bool,
    pub cache_capacity: usize,
    pub output_dir: PathBuf,
    pub dump_raw: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            signature_limit: 100,
            max_transactions: 1000,
            batch_size: 50,
            exclude_failed: false,
            commitment: None,
            strategy: Strategy::Instruction,
            direction: Direction::Out,
            token_type: TokenType::Spl,
            include_inner: false,
            cache_capacity: 256,
            output_dir: PathBuf::from("."),
            dump_raw: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pairs_written: usize,
    pub pairs_skipped: usize,
    pub pairs_failed: usize,
    pub transfers: usize,
}

/// Walks wallet/token pairs one at a time against a single RPC node.
pub struct WalletTracker<R: SolanaRpc> {
    rpc: R,
    settings: TrackerSettings,
    parser: TransactionParser,
    cache: TransactionCache,
}

impl<R: SolanaRpc> WalletTracker<R> {
    pub fn new(rpc: R, settings: TrackerSettings, parser: TransactionParser) -> Self {
        let cache = TransactionCache::new(settings.cache_capacity);
        WalletTracker {
            rpc,
            settings,
            parser,
            cache,
        }
    }

    pub fn cache(&self) -> &TransactionCache {
        &self.cache
    }

    /// Most recent signatures first. Any RPC failure yields an empty list.
    pub async fn fetch_signatures(&self, wallet: &str) -> Vec<String> {
        let config = RpcSignaturesForAddressConfig {
            limit: Some(self.settings.signature_limit),
            commitment: self.settings.commitment,
            ..Default::default()
        };

        let entries = match self.rpc.get_signatures_for_address(wallet, config).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to fetch signatures for {}: {}", wallet, e);
                return Vec::new();
            }
        };

        let mut signatures = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.settings.exclude_failed && entry.is_failed() {
                debug!("Skipping failed transaction {}", entry.signature);
                continue;
            }
            debug!("Got signature: {}", entry.signature);
            signatures.push(entry.signature);
        }
        signatures.truncate(self.settings.max_transactions);
        signatures
    }

    /// One `getTransaction` per signature; failures and unknown signatures
    /// are logged and skipped.
    pub async fn fetch_transactions(&mut self, signatures: &[String]) -> Vec<Value> {
        let mut transactions = Vec::with_capacity(signatures.len());
        for signature in signatures {
            if let Some(tx) = self.cache.get(signature) {
                debug!("Cache hit for transaction {}", signature);
                transactions.push(tx);
                continue;
            }
            match self.rpc.get_transaction(signature).await {
                Ok(Some(tx)) => {
                    info!("Fetched transaction {}", signature);
                    self.cache.insert(signature.clone(), tx.clone());
                    transactions.push(tx);
                }
                Ok(None) => warn!("Transaction {} not found", signature),
                Err(e) => error!("Failed to fetch transaction {}: {}", signature, e),
            }
        }
        transactions
    }

    /// Transfers of `token` involving `wallet`, in signature order.
    ///
    /// Only an invalid address is an error; RPC and parse failures shrink the
    /// result instead.
    pub async fn get_token_transfers(&mut self, wallet: &str, token: &str) -> Result<TransferTable> {
        for address in [wallet, token] {
            if !is_valid_solana_address(address) {
                return Err(TrackerError::AddressFormat(address.to_string()));
            }
        }

        info!(
            "Fetching the latest {} signatures for wallet {}",
            self.settings.signature_limit, wallet
        );
        let signatures = self.fetch_signatures(wallet).await;
        info!("Found {} transactions", signatures.len());

        let query = ExtractQuery::new(wallet, token)
            .direction(self.settings.direction)
            .token_type(self.settings.token_type)
            .include_inner(self.settings.include_inner);

        let mut table = TransferTable::new();
        let mut raw_transactions = Vec::new();
        for sig_batch in batch(&signatures, self.settings.batch_size) {
            info!("Parsing a batch of {} transactions", sig_batch.len());
            let txs = self.fetch_transactions(&sig_batch).await;
            for tx in &txs {
                if let Some(record) = self.parser.parse_transaction(tx, &query, self.settings.strategy) {
                    info!(
                        "Found transfer: {:?} -> {:?} {} {} at {:?}",
                        record.from_address,
                        record.to_address,
                        record.amount,
                        record.token,
                        record.datetime()
                    );
                    table.push(record);
                }
            }
            if self.settings.dump_raw {
                raw_transactions.extend(txs);
            }
        }

        if self.settings.dump_raw {
            let path = report::raw_dump_path(&self.settings.output_dir, wallet);
            if let Err(e) = report::dump_json(&path, &Value::Array(raw_transactions)) {
                error!("Failed to save raw transactions to {}: {}", path.display(), e);
            }
        }

        info!("Parsing finished, {} transfer records found", table.len());
        Ok(table)
    }

    /// Extracts and writes one wallet/token pair. Returns the CSV path.
    pub async fn track_pair(&mut self, wallet: &str, token: &str) -> Result<(PathBuf, usize)> {
        let table = self.get_token_transfers(wallet, token).await?;
        let path = report::output_path(&self.settings.output_dir, wallet, token);
        table.write_csv(&path)?;
        if table.is_empty() {
            info!("No matching transfers for {} / {}", wallet, token);
        }
        Ok((path, table.len()))
    }

    /// Full cross product of wallets and tokens. Invalid addresses and
    /// failed pairs are logged and skipped; nothing here aborts the run.
    pub async fn run(&mut self, wallets: &[String], tokens: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();
        for wallet in wallets {
            if !is_valid_solana_address(wallet) {
                error!("Invalid wallet address {}", wallet);
                summary.pairs_skipped += tokens.len();
                continue;
            }
            for token in tokens {
                if !is_valid_solana_address(token) {
                    error!("Invalid token address {}", token);
                    summary.pairs_skipped += 1;
                    continue;
                }

                info!("Tracking {} transfers for wallet {}", token, wallet);
                match self.track_pair(wallet, token).await {
                    Ok((path, count)) => {
                        info!("{} transfer records written to {}", count, path.display());
                        summary.pairs_written += 1;
                        summary.transfers += count;
                    }
                    Err(e) => {
                        error!("Failed to process wallet {} and token {}: {}", wallet, token, e);
                        summary.pairs_failed += 1;
                    }
                }
            }
        }
        summary
    }
}
