use csv::WriterBuilder;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use crate::address::short;
use crate::error::Result;
use crate::types::TransferRecord;

pub const COLUMNS: [&str; 5] = ["timestamp", "from_address", "to_address", "token", "amount"];

/// Ordered transfer rows for one wallet/token pair. An empty table is still
/// written out with its header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferTable {
    records: Vec<TransferRecord>,
}

impl TransferTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TransferRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TransferRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut w = WriterBuilder::new().has_headers(false).from_writer(writer);
        w.write_record(COLUMNS)?;
        for record in &self.records {
            w.serialize(record)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        self.write_to(File::create(path)?)?;
        info!("Saved {} transfer records to {}", self.len(), path.display());
        Ok(())
    }
}

impl FromIterator<TransferRecord> for TransferTable {
    fn from_iter<I: IntoIterator<Item = TransferRecord>>(iter: I) -> Self {
        TransferTable {
            records: iter.into_iter().collect(),
        }
    }
}

/// `transfers_<wallet[..8]>_<token[..8]>.csv`
pub fn output_path(dir: &Path, wallet: &str, token: &str) -> PathBuf {
    dir.join(format!("transfers_{}_{}.csv", short(wallet), short(token)))
}

/// `debug_transactions_<wallet[..8]>.json`
pub fn raw_dump_path(dir: &Path, wallet: &str) -> PathBuf {
    dir.join(format!("debug_transactions_{}.json", short(wallet)))
}

/// Writes raw transactions verbatim as a pretty-printed JSON array.
pub fn dump_json(path: &Path, value: &Value) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    info!("Saved raw transaction data to {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::fixtures::dec;
    use serde_json::json;

    fn record(amount: &str, to: Option<&str>) -> TransferRecord {
        TransferRecord {
            timestamp: Some(1_700_000_000),
            from_address: Some("from".to_string()),
            to_address: to.map(str::to_string),
            token: "mint".to_string(),
            amount: dec(amount),
        }
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let mut out = Vec::new();
        TransferTable::new().write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "timestamp,from_address,to_address,token,amount\n"
        );
    }

    #[test]
    fn test_rows_follow_column_order() {
        let table: TransferTable = vec![record("6", Some("to")), record("0.25", None)]
            .into_iter()
            .collect();
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1700000000,from,to,mint,6");
        assert_eq!(lines[2], "1700000000,from,,mint,0.25");
    }

    #[test]
    fn test_balance_delta_amount_written_exactly() {
        use crate::parser::extract_by_balance_delta;
        use crate::parser::fixtures::{token_balance, transaction, MINT, RECIPIENT, WALLET};
        use crate::protocol::ProtocolAddressSet;
        use crate::types::{Direction, ExtractQuery};

        let tx = transaction(
            vec![],
            vec![token_balance(0, WALLET, MINT, "0.3")],
            vec![
                token_balance(0, WALLET, MINT, "0.1"),
                token_balance(1, RECIPIENT, MINT, "0.2"),
            ],
        );
        let query = ExtractQuery::new(WALLET, MINT).direction(Direction::Out);
        let table: TransferTable = extract_by_balance_delta(&tx, &query, &ProtocolAddressSet::default())
            .unwrap()
            .into_iter()
            .collect();
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.ends_with(",0.2"), "{}", row);
    }

    #[test]
    fn test_output_paths() {
        let dir = Path::new("out");
        assert_eq!(
            output_path(
                dir,
                "CuwxHwz42cNivJqWGBk6HcVvfGq47868Mo6zi4u6z9vC",
                "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            ),
            PathBuf::from("out/transfers_CuwxHwz4_EPjFWdd5.csv")
        );
        assert_eq!(
            raw_dump_path(dir, "CuwxHwz42cNivJqWGBk6HcVvfGq47868Mo6zi4u6z9vC"),
            PathBuf::from("out/debug_transactions_CuwxHwz4.json")
        );
    }

    #[test]
    fn test_write_csv_and_dump_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("t.csv");
        let table: TransferTable = vec![record("1", Some("to"))].into_iter().collect();
        table.write_csv(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("timestamp,from_address"));

        let dump = dir.path().join("raw.json");
        dump_json(&dump, &json!([{"slot": 1}])).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(&dump).unwrap()).unwrap();
        assert_eq!(back, json!([{"slot": 1}]));
    }
}
