// 按配置的钱包/代币组合导出转账记录
// 所有行为由环境变量 (.env) 驱动，没有命令行参数

use anyhow::Result;
use tracing::instrument::WithSubscriber;
use tracing::{info, warn};
use wallet_tracker::config::Config;
use wallet_tracker::logging::RunLogger;
use wallet_tracker::parser::TransactionParser;
use wallet_tracker::rpc::RpcClient;
use wallet_tracker::tracker::WalletTracker;
use wallet_tracker::types::{Direction, Strategy};

#[tokio::main]
async fn main() -> Result<()> {
    // 配置错误在任何网络请求之前终止
    let config = Config::load()?;

    // 初始化本次运行的日志
    let logger = RunLogger::new(&config.logging)?;

    async move {
        info!("启动钱包转账追踪, RPC: {}", config.rpc.url);

        let protocol = config.protocol_addresses();
        info!("已加载 {} 个协议地址", protocol.len());

        let rpc = RpcClient::new(&config.rpc)?;
        let mut tracker = WalletTracker::new(rpc, config.tracker.clone(), TransactionParser::new(protocol));
        info!(
            "策略: {}, 方向: {:?}, 代币类型: {:?}",
            config.tracker.strategy, config.tracker.direction, config.tracker.token_type
        );
        if config.tracker.strategy == Strategy::BalanceDelta && config.tracker.direction == Direction::In {
            warn!("余额差策略只识别转出, DIRECTION=in 不会产生记录");
        }

        let summary = tracker
            .run(&config.wallet_addresses, &config.token_addresses)
            .await;

        info!(
            "追踪完成: 导出 {} 组, 跳过 {} 组, 失败 {} 组, 共 {} 条转账",
            summary.pairs_written, summary.pairs_skipped, summary.pairs_failed, summary.transfers
        );
        Ok::<(), anyhow::Error>(())
    }
    .with_subscriber(logger.dispatch())
    .await
}
