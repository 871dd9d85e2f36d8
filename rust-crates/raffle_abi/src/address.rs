use crate::{
    AbiError,
    decode_hex,
    keccak256,
};
use serde::{
    Deserialize,
    Deserializer,
};
use std::{
    fmt,
    str::FromStr,
};

/// 20-byte account or contract address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// EIP-55 mixed-case checksum encoding.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Lower-case hex, the form JSON-RPC providers expect.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Reads an address from a 32-byte ABI word.
    pub fn from_word(word: &[u8]) -> Result<Self, AbiError> {
        if word.len() < 32 {
            return Err(AbiError::ShortData {
                expected: 32,
                actual: word.len(),
            });
        }
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::DirtyPadding);
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..32]);
        Ok(Address(bytes))
    }
}

impl FromStr for Address {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if stripped.len() != 40 {
            return Err(AbiError::InvalidAddress(s.to_string()));
        }
        let bytes = decode_hex(stripped).map_err(|_| AbiError::InvalidAddress(s.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Hash of a submitted transaction.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// Shortened form for status lines, e.g. `0x1234abcd…9f00`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..8], &full[full.len() - 4..])
    }
}

impl FromStr for TxHash {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s.trim())?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| AbiError::ShortData {
            expected: 32,
            actual: b.len(),
        })?;
        Ok(TxHash(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn to_checksum__matches_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            // given
            let address = Address::from_str(&expected.to_lowercase()).unwrap();

            // then
            assert_eq!(address.to_string(), expected);
        }
    }

    #[test]
    fn from_str__rejects_wrong_length() {
        let err = Address::from_str("0x1234").unwrap_err();
        assert_eq!(err, AbiError::InvalidAddress("0x1234".to_string()));
    }

    #[test]
    fn from_word__requires_clean_padding() {
        // given
        let mut word = [0u8; 32];
        word[31] = 0x01;
        let mut dirty = word;
        dirty[0] = 0xff;

        // then
        assert_eq!(Address::from_word(&word).unwrap().0[19], 0x01);
        assert_eq!(Address::from_word(&dirty), Err(AbiError::DirtyPadding));
    }

    #[test]
    fn deserialize__reads_addresses_from_json_strings() {
        // given
        let json = r#"["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"]"#;

        // when
        let parsed: Vec<Address> = serde_json::from_str(json).unwrap();

        // then
        assert_eq!(
            parsed[0].to_checksum(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn tx_hash__parses_and_shortens() {
        // given
        let raw = format!("0x{}", "ab".repeat(32));

        // when
        let hash = TxHash::from_str(&raw).unwrap();

        // then
        assert_eq!(hash.to_string(), raw);
        assert_eq!(hash.short(), "0xabababab…abab");
    }
}
