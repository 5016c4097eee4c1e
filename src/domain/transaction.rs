//! 未签名交易模型
//!
//! # 线格式
//!
//! | 字段         | 大小                         |
//! |--------------|------------------------------|
//! | version      | 4 字节 (LE)                  |
//! | timestamp    | 4 字节 (LE)，仅时间戳链      |
//! | input count  | VarInt                       |
//! | inputs       | outpoint + 空脚本 + sequence |
//! | output count | VarInt                       |
//! | outputs      | amount(8 LE) + VarInt + 脚本 |
//! | lock_time    | 4 字节 (LE)                  |

use bitcoin::{consensus::encode::serialize, Amount, ScriptBuf, Sequence, TxIn, TxOut, Witness};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::OutPoint;
use crate::utils::sha256d;

/// 默认 sequence（不启用 RBF / 相对时间锁）
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

/// 最小单位金额上限（金额按有符号 64 位序列化）
pub const MAX_AMOUNT: u64 = i64::MAX as u64;

/// 未签名输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub sequence: u32,
}

impl TxInput {
    /// 空签名脚本的 bitcoin 输入
    fn to_bitcoin(&self) -> TxIn {
        TxIn {
            previous_output: self.previous_output.to_bitcoin(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence(self.sequence),
            witness: Witness::default(),
        }
    }
}

/// 输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub amount: u64,
    pub script_pubkey: ScriptBuf,
}

impl TxOutput {
    fn to_bitcoin(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.amount),
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// 未签名交易骨架
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub version: u32,
    pub timestamp: Option<u32>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl UnsignedTransaction {
    /// 序列化为线格式字节（输入脚本为空，等待外部签名填充）
    ///
    /// 除时间戳外各字段按 bitcoin 共识编码；时间戳链在 version 之后插入 4 字节时间戳。
    pub fn to_bytes(&self) -> Vec<u8> {
        let inputs: Vec<TxIn> = self.inputs.iter().map(TxInput::to_bitcoin).collect();
        let outputs: Vec<TxOut> = self.outputs.iter().map(TxOutput::to_bitcoin).collect();

        let mut buf = Vec::with_capacity(16 + self.inputs.len() * 41 + self.outputs.len() * 34);
        buf.extend_from_slice(&serialize(&self.version));
        if let Some(ts) = self.timestamp {
            buf.extend_from_slice(&serialize(&ts));
        }
        buf.extend_from_slice(&serialize(&inputs));
        buf.extend_from_slice(&serialize(&outputs));
        buf.extend_from_slice(&serialize(&self.lock_time));
        buf
    }
}

/// 被选中的输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedInput {
    pub outpoint: OutPoint,
    pub amount: u64,
}

/// 构建后的输出描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltOutput {
    pub address: String,
    pub amount: u64,
    /// 是否为找零输出
    pub change: bool,
}

/// 构建完成的未签名交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltTransaction {
    pub request_id: Uuid,
    /// 链标识
    pub chain: String,
    /// 未签名交易原始字节
    #[serde(with = "hex")]
    pub raw: Vec<u8>,
    /// 未签名骨架的双 SHA-256（显示顺序），签名后的 txid 与之不同
    pub unsigned_hash: String,
    pub inputs: Vec<SelectedInput>,
    pub outputs: Vec<BuiltOutput>,
    pub fee: u64,
    /// 签名后的预估大小（字节）
    pub estimated_size: usize,
}

impl BuiltTransaction {
    pub fn total_input(&self) -> u64 {
        self.inputs.iter().map(|i| i.amount).sum()
    }

    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    pub fn change_output(&self) -> Option<&BuiltOutput> {
        self.outputs.iter().find(|o| o.change)
    }

    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

/// 未签名骨架哈希（显示顺序）
pub fn unsigned_hash(raw: &[u8]) -> String {
    let mut hash = sha256d(raw);
    hash.reverse();
    hex::encode(hash)
}
