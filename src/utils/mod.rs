pub mod address;
pub mod encoding;

// Re-export commonly used functions
pub use address::AddressCodec;
pub use encoding::{keccak256, sha256d, varint_len, write_varint};
