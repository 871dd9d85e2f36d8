use crate::{
    AbiError,
    Address,
    decode_hex,
    keccak256,
};

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const WORD: usize = 32;

/// The raffle contract entry points this client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleCall {
    EnterRaffle,
    GetEntranceFee,
    GetNumberOfPlayers,
    GetRecentWinner,
}

impl RaffleCall {
    pub const ALL: [RaffleCall; 4] = [
        RaffleCall::EnterRaffle,
        RaffleCall::GetEntranceFee,
        RaffleCall::GetNumberOfPlayers,
        RaffleCall::GetRecentWinner,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            RaffleCall::EnterRaffle => "enterRaffle()",
            RaffleCall::GetEntranceFee => "getEntranceFee()",
            RaffleCall::GetNumberOfPlayers => "getNumberOfPlayers()",
            RaffleCall::GetRecentWinner => "getRecentWinner()",
        }
    }

    pub fn selector(self) -> [u8; 4] {
        selector_of(self.signature())
    }

    /// Call data for the entry point. None of them take arguments, so this is
    /// the bare selector.
    pub fn calldata(self) -> String {
        format!("0x{}", hex::encode(self.selector()))
    }
}

pub fn selector_of(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn first_word(data: &str) -> Result<[u8; WORD], AbiError> {
    let bytes = decode_hex(data)?;
    if bytes.len() < WORD {
        return Err(AbiError::ShortData {
            expected: WORD,
            actual: bytes.len(),
        });
    }
    let mut word = [0u8; WORD];
    word.copy_from_slice(&bytes[..WORD]);
    Ok(word)
}

/// Decodes a `uint256` return value that must fit into `u128`.
pub fn decode_u128(data: &str) -> Result<u128, AbiError> {
    let word = first_word(data)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow("u128"));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decodes a `uint256` return value that must fit into `u64`.
pub fn decode_u64(data: &str) -> Result<u64, AbiError> {
    let value = decode_u128(data).map_err(|e| match e {
        AbiError::Overflow(_) => AbiError::Overflow("u64"),
        other => other,
    })?;
    u64::try_from(value).map_err(|_| AbiError::Overflow("u64"))
}

pub fn decode_address(data: &str) -> Result<Address, AbiError> {
    let word = first_word(data)?;
    Address::from_word(&word)
}

/// Extracts the message of an `Error(string)` revert payload. Returns `None`
/// for custom errors, panics (`Panic(uint256)`) or malformed data.
pub fn decode_revert_reason(data: &str) -> Option<String> {
    let bytes = decode_hex(data).ok()?;
    let body = bytes.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    let offset = word_as_usize(body.get(..WORD)?)?;
    let len_end = offset.checked_add(WORD)?;
    let len = word_as_usize(body.get(offset..len_end)?)?;
    let text = body.get(len_end..len_end.checked_add(len)?)?;
    Some(String::from_utf8_lossy(text).into_owned())
}

fn word_as_usize(word: &[u8]) -> Option<usize> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(low)).ok()
}
