//! 测试辅助模块
//! 提供链参数、账户快照与地址夹具

#![allow(dead_code)]

use std::sync::Arc;

use txcore::{
    config::{BuilderConfig, RunnerConfig},
    domain::{AccountState, BuildRequest, ChainParameters, OutPoint, PaymentOutput, Utxo},
    service::{AsyncTaskRunner, FeePolicy, TransactionBuilder},
    utils::AddressCodec,
};

pub const BTC_MAIN_VERSION: u8 = 0x00;

/// btc-main 参数（与内置表一致）
pub fn btc_main() -> Arc<ChainParameters> {
    Arc::new(
        ChainParameters::new(
            "btc-main",
            "Bitcoin Signed Message:\n",
            vec![BTC_MAIN_VERSION],
            Vec::<String>::new(),
            0,
        )
        .expect("valid btc-main params"),
    )
}

/// 以固定公钥哈希生成 btc-main 地址
pub fn btc_address(tag: u8) -> String {
    AddressCodec::encode(&[BTC_MAIN_VERSION], &[tag; 20])
}

/// 按金额列表生成账户快照，高度依次递增
pub fn account_with(amounts: &[u64]) -> Arc<AccountState> {
    let utxos = amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            Utxo::new(
                OutPoint::new([i as u8 + 1; 32], i as u32),
                *amount,
                Some(100 + i as u32),
            )
        })
        .collect();
    Arc::new(AccountState::new(utxos, btc_address(0xcc)))
}

/// 单输出、固定手续费的 btc-main 请求
pub fn fixed_fee_request(available: &[u64], pay: u64, fee: u64) -> BuildRequest {
    BuildRequest::new(
        account_with(available),
        vec![PaymentOutput::new(btc_address(0xaa), pay)],
        FeePolicy::Fixed { amount: fee },
        btc_main(),
    )
}

pub fn builder() -> TransactionBuilder {
    TransactionBuilder::new(BuilderConfig {
        dust_threshold: 546,
        tx_version: 1,
    })
}

/// 在当前运行时上创建执行器
pub fn runner(max_concurrent_builds: usize) -> AsyncTaskRunner {
    AsyncTaskRunner::new(
        tokio::runtime::Handle::current(),
        &RunnerConfig {
            max_concurrent_builds,
        },
        builder(),
    )
}
