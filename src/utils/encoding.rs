//! 底层编码工具：CompactSize varint 与哈希
//!
//! 线格式与 SHA-256d 交给 bitcoin crate，这里只做薄封装供多链共用。

use bitcoin::{
    consensus::encode::{serialize, VarInt},
    hashes::{sha256d as bitcoin_sha256d, Hash},
};
use sha3::{Digest, Keccak256};

/// 写入 Bitcoin CompactSize varint
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    buf.extend_from_slice(&serialize(&VarInt(n)));
}

/// varint 编码后的字节数
pub fn varint_len(n: u64) -> usize {
    serialize(&VarInt(n)).len()
}

/// 双重 SHA-256
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    bitcoin_sha256d::Hash::hash(data).to_byte_array()
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}
