use crate::{
    contract::RaffleContract,
    error::RaffleError,
    provider::{
        Receipt,
        Transport,
    },
    wallets::{
        WalletContext,
        WalletSource,
    },
};
use raffle_abi::{
    Address,
    TxHash,
};
use serde_json::Value;
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    future::Future,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::Notify;

#[derive(Default)]
struct ScriptedState {
    queued: HashMap<&'static str, VecDeque<Result<Value, RaffleError>>>,
    fallback: HashMap<&'static str, Value>,
    calls: Vec<(&'static str, Value)>,
}

/// Answers JSON-RPC methods from per-method queues, then from a fallback.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptedState>,
}

impl ScriptedTransport {
    pub fn push_ok(&self, method: &'static str, value: Value) {
        self.push(method, Ok(value));
    }

    pub fn push_err(&self, method: &'static str, err: RaffleError) {
        self.push(method, Err(err));
    }

    fn push(&self, method: &'static str, result: Result<Value, RaffleError>) {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry(method)
            .or_default()
            .push_back(result);
    }

    pub fn set_fallback(&self, method: &'static str, value: Value) {
        self.state.lock().unwrap().fallback.insert(method, value);
    }

    pub fn calls(&self) -> Vec<(&'static str, Value)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| *m == method)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn request(
        &self,
        method: &'static str,
        params: Value,
    ) -> impl Future<Output = Result<Value, RaffleError>> + Send {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((method, params));
            match state.queued.get_mut(method).and_then(|q| q.pop_front()) {
                Some(result) => result,
                None => match state.fallback.get(method) {
                    Some(value) => Ok(value.clone()),
                    None => Err(RaffleError::Rpc {
                        code: -32601,
                        message: format!("unscripted method {method}"),
                    }),
                },
            }
        };
        async move { result }
    }
}

#[derive(Debug, Default)]
struct RaffleState {
    entrance_fee: u128,
    number_of_players: u64,
    recent_winner: Address,
    read_error: Option<RaffleError>,
    read_calls: usize,
    read_gate: Option<Arc<Notify>>,
    enter_error: Option<RaffleError>,
    entries: Vec<(Address, Address, u128)>,
    confirm_error: Option<RaffleError>,
    confirm_gate: Option<Arc<Notify>>,
}

/// In-memory raffle. Reads can be failed or held; confirmations can be held
/// until released.
#[derive(Clone, Default)]
pub struct FakeRaffle {
    state: Arc<Mutex<RaffleState>>,
}

impl FakeRaffle {
    pub fn with_state(entrance_fee: u128, number_of_players: u64, recent_winner: Address) -> Self {
        let fake = Self::default();
        fake.set_state(entrance_fee, number_of_players, recent_winner);
        fake
    }

    pub fn set_state(&self, entrance_fee: u128, number_of_players: u64, recent_winner: Address) {
        let mut state = self.state.lock().unwrap();
        state.entrance_fee = entrance_fee;
        state.number_of_players = number_of_players;
        state.recent_winner = recent_winner;
    }

    pub fn fail_reads_with(&self, err: RaffleError) {
        self.state.lock().unwrap().read_error = Some(err);
    }

    pub fn read_calls(&self) -> usize {
        self.state.lock().unwrap().read_calls
    }

    /// Reads started after this block until the returned handle is notified.
    pub fn hold_reads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().read_gate = Some(gate.clone());
        gate
    }

    pub fn release_reads(&self) {
        self.state.lock().unwrap().read_gate = None;
    }

    pub fn fail_enter_with(&self, err: RaffleError) {
        self.state.lock().unwrap().enter_error = Some(err);
    }

    pub fn fail_confirmation_with(&self, err: RaffleError) {
        self.state.lock().unwrap().confirm_error = Some(err);
    }

    pub fn hold_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().confirm_gate = Some(gate.clone());
        gate
    }

    pub fn entries(&self) -> Vec<(Address, Address, u128)> {
        self.state.lock().unwrap().entries.clone()
    }

    fn read<T: Send + 'static>(
        &self,
        pick: fn(&RaffleState) -> T,
    ) -> impl Future<Output = Result<T, RaffleError>> + Send {
        let state = self.state.clone();
        let gate = state.lock().unwrap().read_gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let mut state = state.lock().unwrap();
            state.read_calls += 1;
            match &state.read_error {
                Some(err) => Err(err.clone()),
                None => Ok(pick(&state)),
            }
        }
    }
}

impl RaffleContract for FakeRaffle {
    fn entrance_fee(&self, _raffle: Address) -> impl Future<Output = Result<u128, RaffleError>> + Send {
        self.read(|s| s.entrance_fee)
    }

    fn number_of_players(
        &self,
        _raffle: Address,
    ) -> impl Future<Output = Result<u64, RaffleError>> + Send {
        self.read(|s| s.number_of_players)
    }

    fn recent_winner(
        &self,
        _raffle: Address,
    ) -> impl Future<Output = Result<Address, RaffleError>> + Send {
        self.read(|s| s.recent_winner)
    }

    fn enter_raffle(
        &self,
        raffle: Address,
        from: Address,
        value: u128,
    ) -> impl Future<Output = Result<TxHash, RaffleError>> + Send {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.entries.push((raffle, from, value));
            match &state.enter_error {
                Some(err) => Err(err.clone()),
                None => Ok(TxHash([state.entries.len() as u8; 32])),
            }
        };
        async move { result }
    }

    fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        _confirmations: u64,
    ) -> impl Future<Output = Result<Receipt, RaffleError>> + Send {
        let state = self.state.clone();
        let gate = state.lock().unwrap().confirm_gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let state = state.lock().unwrap();
            match &state.confirm_error {
                Some(err) => Err(err.clone()),
                None => Ok(Receipt {
                    tx_hash,
                    block_number: 42,
                    succeeded: true,
                }),
            }
        }
    }
}

/// Wallet whose context is swapped by the test.
#[derive(Clone, Default)]
pub struct FakeWallet {
    context: Arc<Mutex<Option<WalletContext>>>,
}

impl FakeWallet {
    pub fn set_context(&self, ctx: WalletContext) {
        *self.context.lock().unwrap() = Some(ctx);
    }

    fn current(&self) -> Result<WalletContext, RaffleError> {
        self.context
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RaffleError::Network("provider offline".to_string()))
    }
}

impl WalletSource for FakeWallet {
    fn wallet_context(&self) -> impl Future<Output = Result<WalletContext, RaffleError>> + Send {
        let result = self.current();
        async move { result }
    }

    fn connect(&self) -> impl Future<Output = Result<WalletContext, RaffleError>> + Send {
        let result = self.current();
        async move { result }
    }
}
