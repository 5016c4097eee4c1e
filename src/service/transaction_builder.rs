//! 交易构建器
//!
//! 为 UTXO 链构建未签名交易，签名交给外部签名组件。
//!
//! # 流程
//! 1. 校验请求（输出非空、金额为正、总额不溢出）
//! 2. 按策略选择输入
//! 3. 结算手续费与找零
//! 4. 按链参数编码地址并序列化
//!
//! 每一步之间检查取消标记；某一步开始后会执行完再检查。
//! 构建是纯计算：只读取请求和其中的链参数，不修改任何共享状态。

use tokio_util::sync::CancellationToken;

use super::{coin_selection, fee_policy};
use crate::{
    config::BuilderConfig,
    domain::{
        build_request::BuildRequest,
        transaction::{
            unsigned_hash, BuiltOutput, BuiltTransaction, SelectedInput, TxInput, TxOutput,
            UnsignedTransaction, DEFAULT_SEQUENCE,
        },
    },
    error::BuildError,
    utils::AddressCodec,
};

pub use crate::domain::transaction::MAX_AMOUNT;

/// 构建结果：成功交易或错误，二者必居其一
pub type TransactionResult = Result<BuiltTransaction, BuildError>;

/// 执行器调用的构建入口
///
/// 在阻塞线程池上调用；实现中的 panic 由执行器捕获。
pub trait BuildEngine: Send + Sync + 'static {
    fn build_cancellable(&self, request: &BuildRequest, cancel: &CancellationToken)
        -> TransactionResult;
}

impl BuildEngine for TransactionBuilder {
    fn build_cancellable(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> TransactionResult {
        TransactionBuilder::build_cancellable(self, request, cancel)
    }
}

/// 交易构建器
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    config: BuilderConfig,
}

impl TransactionBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// 构建交易（不可取消）
    pub fn build(&self, request: &BuildRequest) -> TransactionResult {
        self.build_cancellable(request, &CancellationToken::new())
    }

    /// 构建交易，在步骤之间响应取消
    pub fn build_cancellable(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> TransactionResult {
        let span = tracing::debug_span!(
            "build_transaction",
            request_id = %request.request_id,
            chain = %request.chain.identifier()
        );
        let _entered = span.enter();

        // 1. 校验请求
        let target = Self::validate(request)?;
        checkpoint(cancel, "validate")?;

        // 2. 选择输入
        let timestamped = request.chain.uses_timestamped_transactions();
        let selection = coin_selection::select(
            &request.account.utxos,
            request.selection,
            target,
            request.outputs.len(),
            &request.fee_policy,
            timestamped,
        )?;
        tracing::debug!(
            inputs = selection.utxos.len(),
            total_in = selection.total,
            "inputs selected"
        );
        checkpoint(cancel, "select_inputs")?;

        // 3. 结算手续费
        let breakdown = fee_policy::settle(
            &request.fee_policy,
            selection.total,
            target,
            selection.utxos.len(),
            request.outputs.len(),
            timestamped,
            self.config.dust_threshold,
        )?;
        tracing::debug!(fee = breakdown.fee, change = ?breakdown.change, "fee settled");
        checkpoint(cancel, "compute_fee")?;

        // 4. 序列化
        let built = self.serialize(request, &selection, &breakdown)?;
        tracing::debug!(size = built.raw.len(), hash = %built.unsigned_hash, "transaction serialized");
        Ok(built)
    }

    /// 校验请求并返回输出总额
    fn validate(request: &BuildRequest) -> Result<u64, BuildError> {
        if request.outputs.is_empty() {
            return Err(BuildError::invalid_request("at least one output is required"));
        }

        let mut total: u64 = 0;
        for (index, output) in request.outputs.iter().enumerate() {
            if output.amount == 0 {
                return Err(BuildError::invalid_request(format!(
                    "output #{} has zero amount",
                    index
                )));
            }
            total = total
                .checked_add(output.amount)
                .filter(|t| *t <= MAX_AMOUNT)
                .ok_or_else(|| BuildError::invalid_request("total output amount overflows"))?;
        }

        Ok(total)
    }

    fn serialize(
        &self,
        request: &BuildRequest,
        selection: &coin_selection::Selection,
        breakdown: &fee_policy::FeeBreakdown,
    ) -> TransactionResult {
        let chain = &request.chain;
        let version_bytes = chain.address_version_bytes();

        let mut outputs = Vec::with_capacity(request.outputs.len() + 1);
        let mut described = Vec::with_capacity(request.outputs.len() + 1);
        for payment in &request.outputs {
            outputs.push(TxOutput {
                amount: payment.amount,
                script_pubkey: AddressCodec::script_for(&payment.address, version_bytes)?,
            });
            described.push(BuiltOutput {
                address: payment.address.clone(),
                amount: payment.amount,
                change: false,
            });
        }

        if let Some(change) = breakdown.change {
            let change_address = &request.account.change_address;
            outputs.push(TxOutput {
                amount: change,
                script_pubkey: AddressCodec::script_for(change_address, version_bytes)?,
            });
            described.push(BuiltOutput {
                address: change_address.clone(),
                amount: change,
                change: true,
            });
        }

        let timestamp = if chain.uses_timestamped_transactions() {
            let ts = i64::from(request.timestamp) - chain.timing_constant();
            Some(u32::try_from(ts).map_err(|_| {
                BuildError::encoding(format!("transaction timestamp out of range: {}", ts))
            })?)
        } else {
            None
        };

        let tx = UnsignedTransaction {
            version: self.config.tx_version,
            timestamp,
            inputs: selection
                .utxos
                .iter()
                .map(|u| TxInput {
                    previous_output: u.outpoint,
                    sequence: DEFAULT_SEQUENCE,
                })
                .collect(),
            outputs,
            lock_time: request.lock_time,
        };

        let raw = tx.to_bytes();
        Ok(BuiltTransaction {
            request_id: request.request_id,
            chain: chain.identifier().to_string(),
            unsigned_hash: unsigned_hash(&raw),
            raw,
            inputs: selection
                .utxos
                .iter()
                .map(|u| SelectedInput {
                    outpoint: u.outpoint,
                    amount: u.amount,
                })
                .collect(),
            outputs: described,
            fee: breakdown.fee,
            estimated_size: breakdown.estimated_size,
        })
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

fn checkpoint(cancel: &CancellationToken, step: &'static str) -> Result<(), BuildError> {
    if cancel.is_cancelled() {
        tracing::debug!(step, "build cancelled between steps");
        return Err(BuildError::Cancelled);
    }
    Ok(())
}
