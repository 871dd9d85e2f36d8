use crate::{
    error::RaffleError,
    provider::{
        Receipt,
        RpcProvider,
        Transport,
    },
};
use raffle_abi::{
    Address,
    RaffleCall,
    TxHash,
    calls::{
        decode_address,
        decode_u64,
        decode_u128,
    },
};
use std::future::Future;
use tracing::{
    debug,
    info,
};

/// The raffle contract's entry points, addressed by deployment.
pub trait RaffleContract: Send + Sync + 'static {
    fn entrance_fee(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<u128, RaffleError>> + Send;

    fn number_of_players(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<u64, RaffleError>> + Send;

    fn recent_winner(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<Address, RaffleError>> + Send;

    /// Submits a payable `enterRaffle()` and returns once the wallet has
    /// broadcast it.
    fn enter_raffle(
        &self,
        raffle: Address,
        from: Address,
        value: u128,
    ) -> impl Future<Output = Result<TxHash, RaffleError>> + Send;

    fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> impl Future<Output = Result<Receipt, RaffleError>> + Send;
}

/// Result of one full read of the raffle's public state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleSnapshot {
    pub entrance_fee: u128,
    pub number_of_players: u64,
    pub recent_winner: Address,
}

/// Reads fee, player count and winner one after another. Nothing is returned
/// unless all three succeed.
pub async fn read_snapshot<C: RaffleContract>(
    contract: &C,
    raffle: Address,
) -> Result<RaffleSnapshot, RaffleError> {
    let entrance_fee = contract.entrance_fee(raffle).await?;
    let number_of_players = contract.number_of_players(raffle).await?;
    let recent_winner = contract.recent_winner(raffle).await?;
    debug!(%raffle, entrance_fee, number_of_players, %recent_winner, "raffle state read");
    Ok(RaffleSnapshot {
        entrance_fee,
        number_of_players,
        recent_winner,
    })
}

impl<T: Transport> RaffleContract for RpcProvider<T> {
    async fn entrance_fee(&self, raffle: Address) -> Result<u128, RaffleError> {
        let data = self
            .call(raffle, &RaffleCall::GetEntranceFee.calldata())
            .await?;
        Ok(decode_u128(&data)?)
    }

    async fn number_of_players(&self, raffle: Address) -> Result<u64, RaffleError> {
        let data = self
            .call(raffle, &RaffleCall::GetNumberOfPlayers.calldata())
            .await?;
        Ok(decode_u64(&data)?)
    }

    async fn recent_winner(&self, raffle: Address) -> Result<Address, RaffleError> {
        let data = self
            .call(raffle, &RaffleCall::GetRecentWinner.calldata())
            .await?;
        Ok(decode_address(&data)?)
    }

    async fn enter_raffle(
        &self,
        raffle: Address,
        from: Address,
        value: u128,
    ) -> Result<TxHash, RaffleError> {
        let tx_hash = self
            .send_transaction(from, raffle, value, &RaffleCall::EnterRaffle.calldata())
            .await?;
        info!(%raffle, %from, value, %tx_hash, "enterRaffle submitted");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<Receipt, RaffleError> {
        self.wait_for_receipt(tx_hash, confirmations).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_fakes::{
        FakeRaffle,
        ScriptedTransport,
    };
    use raffle_abi::test_helpers::{
        address_from_byte,
        encode_address_word,
        encode_uint_word,
    };
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn read_snapshot__calls_getters_in_order_over_rpc() {
        // given
        let transport = ScriptedTransport::default();
        let winner = address_from_byte(0x77);
        transport.push_ok("eth_call", json!(encode_uint_word(10_000_000_000_000_000)));
        transport.push_ok("eth_call", json!(encode_uint_word(4)));
        transport.push_ok("eth_call", json!(encode_address_word(winner)));
        let provider =
            RpcProvider::new(transport, Duration::from_millis(1), Duration::from_secs(1));
        let raffle = address_from_byte(0x01);

        // when
        let snapshot = read_snapshot(&provider, raffle).await.unwrap();

        // then
        assert_eq!(
            snapshot,
            RaffleSnapshot {
                entrance_fee: 10_000_000_000_000_000,
                number_of_players: 4,
                recent_winner: winner,
            }
        );
        let data: Vec<_> = provider
            .transport()
            .calls()
            .into_iter()
            .map(|(_, params)| params[0]["data"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            data,
            vec![
                RaffleCall::GetEntranceFee.calldata(),
                RaffleCall::GetNumberOfPlayers.calldata(),
                RaffleCall::GetRecentWinner.calldata(),
            ]
        );
    }

    #[tokio::test]
    async fn read_snapshot__stops_at_first_failure() {
        // given
        let fake = FakeRaffle::default();
        fake.fail_reads_with(RaffleError::Network("connection refused".to_string()));

        // when
        let err = read_snapshot(&fake, address_from_byte(1)).await.unwrap_err();

        // then
        assert_eq!(err, RaffleError::Network("connection refused".to_string()));
        assert_eq!(fake.read_calls(), 1);
    }

    #[tokio::test]
    async fn enter_raffle__sends_payable_call_with_fee_as_value() {
        // given
        let transport = ScriptedTransport::default();
        transport.push_ok("eth_sendTransaction", json!(format!("0x{}", "01".repeat(32))));
        let provider =
            RpcProvider::new(transport, Duration::from_millis(1), Duration::from_secs(1));

        // when
        provider
            .enter_raffle(address_from_byte(9), address_from_byte(8), 12345)
            .await
            .unwrap();

        // then
        let calls = provider.transport().calls();
        assert_eq!(calls[0].1[0]["data"], json!(RaffleCall::EnterRaffle.calldata()));
        assert_eq!(calls[0].1[0]["value"], json!("0x3039"));
    }
}
