//! UTXO 选择
//!
//! 两种确定性策略：
//! - `LargestFirst`：金额降序，金额相同按 outpoint 升序。输入最少，手续费最低。
//! - `OldestFirst`：确认高度升序（未确认排最后），同高度按金额降序、outpoint 升序。
//!   优先消耗老币，减少 UTXO 集合碎片。
//!
//! 按顺序累加，直到输入能覆盖目标金额加上该输入数量下的手续费。

use serde::{Deserialize, Serialize};

use super::fee_policy::{fee_for, FeePolicy};
use crate::{
    domain::{account::Utxo, transaction::MAX_AMOUNT},
    error::BuildError,
};

/// UTXO 选择策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    LargestFirst,
    OldestFirst,
}

/// 选择结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub utxos: Vec<Utxo>,
    pub total: u64,
}

/// 按策略排序候选 UTXO（零金额输出被忽略）
pub fn order_candidates(utxos: &[Utxo], policy: SelectionPolicy) -> Vec<&Utxo> {
    let mut candidates: Vec<&Utxo> = utxos.iter().filter(|u| u.amount > 0).collect();

    match policy {
        SelectionPolicy::LargestFirst => candidates.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.outpoint.cmp(&b.outpoint))
        }),
        SelectionPolicy::OldestFirst => candidates.sort_by(|a, b| {
            let ha = a.height.unwrap_or(u32::MAX);
            let hb = b.height.unwrap_or(u32::MAX);
            ha.cmp(&hb)
                .then_with(|| b.amount.cmp(&a.amount))
                .then_with(|| a.outpoint.cmp(&b.outpoint))
        }),
    }

    candidates
}

/// 选择输入
///
/// # 参数
/// - `target`: 输出总额
/// - `outputs`: 支付输出数量（不含找零）
pub fn select(
    utxos: &[Utxo],
    policy: SelectionPolicy,
    target: u64,
    outputs: usize,
    fee_policy: &FeePolicy,
    timestamped: bool,
) -> Result<Selection, BuildError> {
    let candidates = order_candidates(utxos, policy);

    let mut selected = Vec::new();
    let mut total: u64 = 0;

    for utxo in &candidates {
        selected.push((*utxo).clone());
        total = total
            .checked_add(utxo.amount)
            .filter(|t| *t <= MAX_AMOUNT)
            .ok_or_else(|| BuildError::invalid_request("total input amount overflows"))?;

        let fee = fee_for(fee_policy, selected.len(), outputs, timestamped)?;
        if total >= target.saturating_add(fee) {
            return Ok(Selection {
                utxos: selected,
                total,
            });
        }
    }

    let fee = fee_for(fee_policy, candidates.len().max(1), outputs, timestamped)?;
    Err(BuildError::InsufficientFunds {
        needed: target.saturating_add(fee),
        available: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::OutPoint;

    fn utxo(tag: u8, amount: u64, height: Option<u32>) -> Utxo {
        Utxo::new(OutPoint::new([tag; 32], 0), amount, height)
    }

    const FIXED: FeePolicy = FeePolicy::Fixed { amount: 1000 };

    #[test]
    fn test_largest_first_ordering() {
        let utxos = vec![
            utxo(1, 500, Some(1)),
            utxo(2, 9000, Some(5)),
            utxo(3, 9000, Some(2)),
            utxo(4, 0, Some(1)),
        ];
        let ordered: Vec<u8> = order_candidates(&utxos, SelectionPolicy::LargestFirst)
            .iter()
            .map(|u| u.outpoint.txid[0])
            .collect();
        assert_eq!(ordered, vec![2, 3, 1]);
    }

    #[test]
    fn test_oldest_first_ordering() {
        let utxos = vec![
            utxo(1, 500, None),
            utxo(2, 9000, Some(5)),
            utxo(3, 100, Some(2)),
        ];
        let ordered: Vec<u8> = order_candidates(&utxos, SelectionPolicy::OldestFirst)
            .iter()
            .map(|u| u.outpoint.txid[0])
            .collect();
        assert_eq!(ordered, vec![3, 2, 1]);
    }

    #[test]
    fn test_select_stops_when_covered() {
        let utxos = vec![utxo(1, 30_000, Some(1)), utxo(2, 40_000, Some(2)), utxo(3, 5_000, Some(3))];
        let selection =
            select(&utxos, SelectionPolicy::LargestFirst, 60_000, 1, &FIXED, false).unwrap();
        assert_eq!(selection.utxos.len(), 2);
        assert_eq!(selection.total, 70_000);
    }

    #[test]
    fn test_select_insufficient_funds() {
        let utxos = vec![utxo(1, 30_000, Some(1)), utxo(2, 20_000, Some(2))];
        let err =
            select(&utxos, SelectionPolicy::LargestFirst, 60_000, 1, &FIXED, false).unwrap_err();
        assert_eq!(
            err,
            BuildError::InsufficientFunds {
                needed: 61_000,
                available: 50_000
            }
        );
    }

    #[test]
    fn test_select_empty_account() {
        let err = select(&[], SelectionPolicy::OldestFirst, 1, 1, &FIXED, false).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InsufficientFunds { available: 0, .. }
        ));
    }

    #[test]
    fn test_input_total_above_max_amount_is_invalid() {
        let utxos = vec![utxo(1, u64::MAX, Some(1))];
        let err =
            select(&utxos, SelectionPolicy::LargestFirst, 1_000, 1, &FIXED, false).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRequest(_)));

        // 逐个累加越过上限
        let utxos = vec![utxo(1, MAX_AMOUNT, Some(1)), utxo(2, 1, Some(2))];
        let err = select(&utxos, SelectionPolicy::OldestFirst, MAX_AMOUNT, 1, &FIXED, false)
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidRequest(_)));
    }

    #[test]
    fn test_per_byte_fee_pulls_extra_input() {
        // 单个输入刚好覆盖目标但不够手续费
        let utxos = vec![utxo(1, 10_000, Some(1)), utxo(2, 5_000, Some(1))];
        let policy = FeePolicy::PerByte { rate: 10 };
        let selection =
            select(&utxos, SelectionPolicy::LargestFirst, 10_000, 1, &policy, false).unwrap();
        assert_eq!(selection.utxos.len(), 2);
    }
}
