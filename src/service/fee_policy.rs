//! 手续费策略
//!
//! 手续费只取决于输入/输出数量与策略本身，同样的输入输出总得到同样的手续费

use serde::{Deserialize, Serialize};

use crate::{domain::transaction::MAX_AMOUNT, error::BuildError, utils::varint_len};

/// 已签名 P2PKH 输入的预估大小：outpoint(36) + 脚本长度(1) + 签名脚本(107) + sequence(4)
pub const P2PKH_INPUT_SIZE: usize = 148;

/// P2PKH 输出大小：金额(8) + 脚本长度(1) + 脚本(25)
pub const P2PKH_OUTPUT_SIZE: usize = 34;

/// 手续费策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeePolicy {
    /// 按预估签名后大小计费（每字节 `rate` 个最小单位）
    PerByte { rate: u64 },
    /// 固定手续费
    Fixed { amount: u64 },
}

impl FeePolicy {
    /// 计算给定大小的手续费
    pub fn fee_for_size(&self, size: usize) -> Result<u64, BuildError> {
        match *self {
            FeePolicy::PerByte { rate } => rate
                .checked_mul(size as u64)
                .ok_or_else(|| BuildError::invalid_request("fee rate overflows")),
            FeePolicy::Fixed { amount } => Ok(amount),
        }
    }
}

/// 预估签名后的交易大小
pub fn estimate_size(inputs: usize, outputs: usize, timestamped: bool) -> usize {
    let timestamp = if timestamped { 4 } else { 0 };
    4 + timestamp
        + varint_len(inputs as u64)
        + inputs * P2PKH_INPUT_SIZE
        + varint_len(outputs as u64)
        + outputs * P2PKH_OUTPUT_SIZE
        + 4
}

/// 给定输入输出数量时需要的手续费
pub fn fee_for(
    policy: &FeePolicy,
    inputs: usize,
    outputs: usize,
    timestamped: bool,
) -> Result<u64, BuildError> {
    policy.fee_for_size(estimate_size(inputs, outputs, timestamped))
}

/// 手续费与找零结算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub fee: u64,
    pub change: Option<u64>,
    pub estimated_size: usize,
}

/// 结算手续费与找零
///
/// 找零低于粉尘阈值时不生成找零输出，剩余部分并入手续费。
/// 结果满足 `total_in == target + fee + change`。
/// 输入总额超过 [`MAX_AMOUNT`] 时找零无法序列化，返回 `InvalidRequest`。
pub fn settle(
    policy: &FeePolicy,
    total_in: u64,
    target: u64,
    inputs: usize,
    outputs: usize,
    timestamped: bool,
    dust_threshold: u64,
) -> Result<FeeBreakdown, BuildError> {
    if total_in > MAX_AMOUNT {
        return Err(BuildError::invalid_request(format!(
            "total input amount {} exceeds {}",
            total_in, MAX_AMOUNT
        )));
    }

    let size_with_change = estimate_size(inputs, outputs + 1, timestamped);
    let fee_with_change = policy.fee_for_size(size_with_change)?;

    if let Some(change) = target
        .checked_add(fee_with_change)
        .and_then(|needed| total_in.checked_sub(needed))
    {
        if change >= dust_threshold && change > 0 {
            return Ok(FeeBreakdown {
                fee: fee_with_change,
                change: Some(change),
                estimated_size: size_with_change,
            });
        }
    }

    let size_exact = estimate_size(inputs, outputs, timestamped);
    let fee_exact = policy.fee_for_size(size_exact)?;
    let needed = target.saturating_add(fee_exact);
    if total_in < needed {
        return Err(BuildError::InsufficientFunds {
            needed,
            available: total_in,
        });
    }

    Ok(FeeBreakdown {
        fee: total_in - target,
        change: None,
        estimated_size: size_exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_size() {
        // 4 + 1 + 148 + 1 + 68 + 4
        assert_eq!(estimate_size(1, 2, false), 226);
        assert_eq!(estimate_size(1, 2, true), 230);
    }

    #[test]
    fn test_fee_is_deterministic() {
        let policy = FeePolicy::PerByte { rate: 10 };
        let a = fee_for(&policy, 3, 2, false).unwrap();
        let b = fee_for(&policy, 3, 2, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 10 * estimate_size(3, 2, false) as u64);
    }

    #[test]
    fn test_settle_rejects_unencodable_input_total() {
        let policy = FeePolicy::Fixed { amount: 1000 };
        let err = settle(&policy, u64::MAX, 1000, 1, 1, false, 546).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRequest(_)));

        let ok = settle(&policy, MAX_AMOUNT, 1000, 1, 1, false, 546).unwrap();
        assert_eq!(ok.change, Some(MAX_AMOUNT - 2000));
    }

    #[test]
    fn test_fixed_fee_with_change() {
        let policy = FeePolicy::Fixed { amount: 1000 };
        let breakdown = settle(&policy, 100_000, 50_000, 1, 1, false, 546).unwrap();
        assert_eq!(breakdown.fee, 1000);
        assert_eq!(breakdown.change, Some(49_000));
    }

    #[test]
    fn test_dust_change_is_folded_into_fee() {
        let policy = FeePolicy::Fixed { amount: 1000 };
        let breakdown = settle(&policy, 51_500, 50_000, 1, 1, false, 546).unwrap();
        assert_eq!(breakdown.change, None);
        assert_eq!(breakdown.fee, 1500);
    }

    #[test]
    fn test_exact_amount_without_change() {
        let policy = FeePolicy::Fixed { amount: 1000 };
        let breakdown = settle(&policy, 51_000, 50_000, 1, 1, false, 546).unwrap();
        assert_eq!(breakdown.change, None);
        assert_eq!(breakdown.fee, 1000);
    }

    #[test]
    fn test_settle_insufficient() {
        let policy = FeePolicy::PerByte { rate: 1 };
        let err = settle(&policy, 50_100, 50_000, 1, 1, false, 546).unwrap_err();
        assert_eq!(
            err,
            BuildError::InsufficientFunds {
                needed: 50_000 + estimate_size(1, 1, false) as u64,
                available: 50_100
            }
        );
    }

    #[test]
    fn test_fee_overflow_is_invalid_request() {
        let policy = FeePolicy::PerByte { rate: u64::MAX };
        assert!(matches!(
            policy.fee_for_size(2),
            Err(BuildError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_policy_serde_tags() {
        let policy: FeePolicy =
            serde_json::from_str(r#"{"type":"per_byte","rate":12}"#).unwrap();
        assert_eq!(policy, FeePolicy::PerByte { rate: 12 });
        let policy: FeePolicy = serde_json::from_str(r#"{"type":"fixed","amount":1000}"#).unwrap();
        assert_eq!(policy, FeePolicy::Fixed { amount: 1000 });
    }
}
