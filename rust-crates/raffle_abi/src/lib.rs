//! ABI bindings for the raffle contract: entry point selectors, return value
//! decoding and display helpers for on-chain values.

use tiny_keccak::{
    Hasher,
    Keccak,
};

pub mod address;
pub mod calls;
pub mod units;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use address::{
    Address,
    TxHash,
};
pub use calls::RaffleCall;
pub use units::{
    ETHER_DECIMALS,
    format_ether,
    format_units,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("invalid hex data: {0}")]
    InvalidHex(String),
    #[error("return data too short: expected at least {expected} bytes, got {actual}")]
    ShortData { expected: usize, actual: usize },
    #[error("value does not fit into {0}")]
    Overflow(&'static str),
    #[error("address word has non-zero padding")]
    DirtyPadding,
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
}

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Decodes `0x`-prefixed (or bare) hex into bytes.
pub fn decode_hex(data: &str) -> Result<Vec<u8>, AbiError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| AbiError::InvalidHex(format!("{e}: {data}")))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn keccak256__hashes_empty_input() {
        // when
        let hash = keccak256(b"");

        // then
        assert_eq!(
            hex::encode(hash),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn decode_hex__accepts_prefixed_and_bare_input() {
        assert_eq!(decode_hex("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(decode_hex("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(matches!(decode_hex("0xzz"), Err(AbiError::InvalidHex(_))));
    }
}
