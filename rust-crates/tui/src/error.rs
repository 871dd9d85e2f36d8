use raffle_abi::{
    AbiError,
    calls::decode_revert_reason,
};

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// Geth/Anvil code for `eth_call`/`eth_estimateGas` execution reverts.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Outcome of a failed contract read or transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaffleError {
    #[error("request rejected in wallet")]
    UserRejected,
    #[error("insufficient funds to pay the entrance fee and gas")]
    InsufficientFunds,
    #[error("contract reverted: {reason}")]
    Reverted { reason: String },
    #[error("provider error ({code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("network failure: {0}")]
    Network(String),
    #[error("could not decode contract response: {0}")]
    Decode(String),
    #[error("transaction was not confirmed in time")]
    ConfirmationTimeout,
    #[error("no raffle contract is deployed on this network")]
    NoContract,
    #[error("no wallet account is connected")]
    NotConnected,
    #[error("a transaction is already pending")]
    TransactionPending,
    #[error("entrance fee has not been read yet")]
    FeeUnknown,
}

impl RaffleError {
    /// Maps a JSON-RPC error object onto the failure kinds the UI tells apart.
    pub fn from_rpc(code: i64, message: &str, data: Option<&str>) -> Self {
        let lowered = message.to_ascii_lowercase();
        if code == USER_REJECTED_CODE
            || lowered.contains("user rejected")
            || lowered.contains("user denied")
        {
            return RaffleError::UserRejected;
        }
        if lowered.contains("insufficient funds") {
            return RaffleError::InsufficientFunds;
        }
        if code == EXECUTION_REVERTED_CODE || lowered.contains("revert") {
            let reason = data
                .and_then(decode_revert_reason)
                .unwrap_or_else(|| message.to_string());
            return RaffleError::Reverted { reason };
        }
        RaffleError::Rpc {
            code,
            message: message.to_string(),
        }
    }

    /// Short label for the status line.
    pub fn kind(&self) -> &'static str {
        match self {
            RaffleError::UserRejected => "cancelled",
            RaffleError::InsufficientFunds => "insufficient funds",
            RaffleError::Reverted { .. } => "reverted",
            RaffleError::Rpc { .. } => "provider error",
            RaffleError::Network(_) => "network failure",
            RaffleError::Decode(_) => "bad response",
            RaffleError::ConfirmationTimeout => "timed out",
            RaffleError::NoContract
            | RaffleError::NotConnected
            | RaffleError::TransactionPending
            | RaffleError::FeeUnknown => "not ready",
        }
    }
}

impl From<AbiError> for RaffleError {
    fn from(err: AbiError) -> Self {
        RaffleError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for RaffleError {
    fn from(err: reqwest::Error) -> Self {
        RaffleError::Network(err.to_string())
    }
}
