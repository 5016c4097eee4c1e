//! 账户快照模型
//!
//! 调用方在构建前拉取好的 UTXO 集合；构建器只读，不做任何修改

use std::fmt;

use bitcoin::{consensus::encode::serialize, hashes::Hash, Txid};
use serde::{Deserialize, Serialize};

/// 交易输出引用
///
/// `txid` 使用 RPC/浏览器显示顺序（大端），序列化到交易时再反转。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    #[serde(with = "hex")]
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        Self { txid, vout }
    }

    /// 转为 bitcoin crate 的 outpoint（txid 按内部字节序）
    pub fn to_bitcoin(&self) -> bitcoin::OutPoint {
        let mut txid = self.txid;
        txid.reverse();
        bitcoin::OutPoint {
            txid: Txid::from_byte_array(txid),
            vout: self.vout,
        }
    }

    /// 交易线格式：txid（小端）+ vout（4 字节小端）
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&serialize(&self.to_bitcoin()));
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

/// 未花费输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// 最小单位金额（satoshi 等）
    pub amount: u64,
    /// 确认高度，未确认为 `None`
    #[serde(default)]
    pub height: Option<u32>,
}

impl Utxo {
    pub fn new(outpoint: OutPoint, amount: u64, height: Option<u32>) -> Self {
        Self {
            outpoint,
            amount,
            height,
        }
    }
}

/// 账户状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub utxos: Vec<Utxo>,
    /// 找零地址
    pub change_address: String,
}

impl AccountState {
    pub fn new(utxos: Vec<Utxo>, change_address: impl Into<String>) -> Self {
        Self {
            utxos,
            change_address: change_address.into(),
        }
    }

    /// 可用余额（饱和加法，避免异常数据溢出）
    pub fn available(&self) -> u64 {
        self.utxos
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outpoint_wire_format_reverses_txid() {
        let mut txid = [0u8; 32];
        txid[0] = 0xaa;
        txid[31] = 0xbb;
        let mut buf = Vec::new();
        OutPoint::new(txid, 1).write_to(&mut buf);

        assert_eq!(buf.len(), 36);
        assert_eq!(buf[0], 0xbb);
        assert_eq!(buf[31], 0xaa);
        assert_eq!(&buf[32..], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_bitcoin_outpoint_displays_same_txid() {
        let outpoint = OutPoint::new([0x11; 32], 7);
        let converted = outpoint.to_bitcoin();
        assert_eq!(converted.vout, 7);
        assert_eq!(converted.txid.to_string(), hex::encode(outpoint.txid));

        let mut txid = [0u8; 32];
        txid[0] = 0xaa;
        assert!(OutPoint::new(txid, 0)
            .to_bitcoin()
            .txid
            .to_string()
            .starts_with("aa"));
    }

    #[test]
    fn test_available_balance() {
        let account = AccountState::new(
            vec![
                Utxo::new(OutPoint::new([1; 32], 0), 10, Some(1)),
                Utxo::new(OutPoint::new([2; 32], 0), 32, None),
            ],
            "change",
        );
        assert_eq!(account.available(), 42);
    }

    #[test]
    fn test_utxo_deserialize_hex_txid() {
        let utxo: Utxo = serde_json::from_value(serde_json::json!({
            "outpoint": { "txid": "11".repeat(32), "vout": 3 },
            "amount": 5000
        }))
        .unwrap();
        assert_eq!(utxo.outpoint.txid, [0x11; 32]);
        assert_eq!(utxo.height, None);
    }
}
