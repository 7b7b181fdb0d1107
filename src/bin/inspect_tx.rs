// 调试工具: 获取单笔交易, 保存原始数据并打印代币余额变化
// 用法: inspect_tx [signature]

use anyhow::Result;
use chrono::DateTime;
use std::path::Path;
use wallet_tracker::config::Config;
use wallet_tracker::parser::balance_changes;
use wallet_tracker::report::dump_json;
use wallet_tracker::rpc::{RpcClient, SolanaRpc};

const DEFAULT_SIGNATURE: &str =
    "4eLiHLXJWQA5YupP3XvwMuMPtc19jE2AhF2PKF7D9DdZVjgb1NsJ8aoD7o1tQYgXwsRvW8RE9MYUSxce9rMvDcAi";
const DUMP_FILE: &str = "debug_single_transaction.json";

#[tokio::main]
async fn main() -> Result<()> {
    let signature = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SIGNATURE.to_string());

    let config = Config::load()?;
    let client = RpcClient::new(&config.rpc)?;

    let tx = match client.get_transaction(&signature).await {
        Ok(Some(tx)) if tx.get("meta").map_or(false, |m| !m.is_null()) => tx,
        Ok(_) => {
            println!("未找到交易记录: {}", signature);
            return Ok(());
        }
        Err(e) => {
            println!("获取交易详情失败: {}", e);
            return Ok(());
        }
    };

    dump_json(Path::new(DUMP_FILE), &tx)?;
    println!("已保存原始交易数据到 {}", DUMP_FILE);

    if let Some(ts) = tx.get("blockTime").and_then(|v| v.as_i64()) {
        if let Some(at) = DateTime::from_timestamp(ts, 0) {
            println!("区块时间: {}", at.to_rfc3339());
        }
    }

    let changes = balance_changes(&tx)?;
    if changes.is_empty() {
        println!("该交易没有代币余额变化");
        return Ok(());
    }

    println!("\n转账详情:");
    println!("{}", "-".repeat(50));
    for change in changes {
        println!("账户索引: {}", change.account_index);
        println!("代币: {}", change.mint);
        println!("地址: {}", change.owner.as_deref().unwrap_or("-"));
        let sign = if change.change.is_sign_negative() { "" } else { "+" };
        println!("余额: {} -> {} ({}{})", change.pre, change.post, sign, change.change);
        println!();
    }

    Ok(())
}
