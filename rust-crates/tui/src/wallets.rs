use crate::{
    error::RaffleError,
    provider::{
        RpcProvider,
        Transport,
    },
};
use deployments::chain_label;
use raffle_abi::Address;
use std::future::Future;

/// What the web3 provider currently exposes: the active chain and the
/// accounts the user has connected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletContext {
    pub chain_id: Option<u64>,
    pub accounts: Vec<Address>,
}

impl WalletContext {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(chain_id: u64, accounts: Vec<Address>) -> Self {
        Self {
            chain_id: Some(chain_id),
            accounts,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.chain_id.is_some() && !self.accounts.is_empty()
    }

    /// The account transactions are sent from: `preferred` when the provider
    /// exposes it, otherwise the first exposed account.
    pub fn select_account(&self, preferred: Option<Address>) -> Option<Address> {
        match preferred {
            Some(wanted) => self.accounts.iter().find(|a| **a == wanted).copied(),
            None => self.accounts.first().copied(),
        }
    }

    pub fn network_label(&self) -> String {
        match self.chain_id {
            Some(id) => format!("{} ({id})", chain_label(id)),
            None => String::from("unknown network"),
        }
    }
}

/// Source of the injected wallet context.
pub trait WalletSource: Send + Sync + 'static {
    fn wallet_context(&self) -> impl Future<Output = Result<WalletContext, RaffleError>> + Send;

    /// Prompts the wallet to expose accounts.
    fn connect(&self) -> impl Future<Output = Result<WalletContext, RaffleError>> + Send;
}

impl<T: Transport> WalletSource for RpcProvider<T> {
    async fn wallet_context(&self) -> Result<WalletContext, RaffleError> {
        let chain_id = self.chain_id().await?;
        let accounts = self.accounts().await?;
        Ok(WalletContext::connected(chain_id, accounts))
    }

    async fn connect(&self) -> Result<WalletContext, RaffleError> {
        let accounts = self.request_accounts().await?;
        let chain_id = self.chain_id().await?;
        Ok(WalletContext::connected(chain_id, accounts))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_fakes::ScriptedTransport;
    use raffle_abi::test_helpers::address_from_byte;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn is_connected__requires_chain_and_account() {
        assert!(!WalletContext::disconnected().is_connected());
        assert!(!WalletContext::connected(1, vec![]).is_connected());
        assert!(WalletContext::connected(1, vec![address_from_byte(1)]).is_connected());
    }

    #[test]
    fn select_account__prefers_configured_account_when_exposed() {
        // given
        let ctx = WalletContext::connected(
            5,
            vec![address_from_byte(1), address_from_byte(2)],
        );

        // then
        assert_eq!(ctx.select_account(None), Some(address_from_byte(1)));
        assert_eq!(
            ctx.select_account(Some(address_from_byte(2))),
            Some(address_from_byte(2))
        );
        assert_eq!(ctx.select_account(Some(address_from_byte(3))), None);
    }

    #[test]
    fn network_label__names_known_chains() {
        assert_eq!(
            WalletContext::connected(11155111, vec![]).network_label(),
            "Sepolia (11155111)"
        );
        assert_eq!(WalletContext::disconnected().network_label(), "unknown network");
    }

    #[tokio::test]
    async fn wallet_context__reads_chain_and_accounts_from_provider() {
        // given
        let transport = ScriptedTransport::default();
        transport.push_ok("eth_chainId", json!("0x5"));
        transport.push_ok("eth_accounts", json!([address_from_byte(4).to_hex()]));
        let provider =
            RpcProvider::new(transport, Duration::from_millis(1), Duration::from_secs(1));

        // when
        let ctx = provider.wallet_context().await.unwrap();

        // then
        assert_eq!(ctx, WalletContext::connected(5, vec![address_from_byte(4)]));
    }

    #[tokio::test]
    async fn connect__requests_accounts_before_reading_chain() {
        // given
        let transport = ScriptedTransport::default();
        transport.push_ok("eth_requestAccounts", json!([address_from_byte(4).to_hex()]));
        transport.push_ok("eth_chainId", json!("0x7a69"));
        let provider =
            RpcProvider::new(transport, Duration::from_millis(1), Duration::from_secs(1));

        // when
        let ctx = provider.connect().await.unwrap();

        // then
        assert_eq!(ctx.chain_id, Some(31337));
        let methods: Vec<_> = provider
            .transport()
            .calls()
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        assert_eq!(methods, vec!["eth_requestAccounts", "eth_chainId"]);
    }
}
