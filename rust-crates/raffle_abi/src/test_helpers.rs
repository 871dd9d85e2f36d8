//! Encoders for building canned `eth_call` results and revert payloads in
//! tests.

use crate::{
    Address,
    calls::ERROR_STRING_SELECTOR,
};

pub fn encode_uint_word(value: u128) -> String {
    format!("0x{:064x}", value)
}

pub fn encode_address_word(address: Address) -> String {
    format!("0x{}{}", "00".repeat(12), hex::encode(address.0))
}

pub fn encode_revert_data(reason: &str) -> String {
    let mut data = format!("0x{}", hex::encode(ERROR_STRING_SELECTOR));
    data.push_str(&format!("{:064x}", 32));
    data.push_str(&format!("{:064x}", reason.len()));
    let mut body = hex::encode(reason);
    while body.len() % 64 != 0 {
        body.push('0');
    }
    data.push_str(&body);
    data
}

pub fn address_from_byte(byte: u8) -> Address {
    Address([byte; 20])
}
