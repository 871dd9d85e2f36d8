use crate::{
    config::AppConfig,
    contract::{
        RaffleContract,
        RaffleSnapshot,
        read_snapshot,
    },
    error::RaffleError,
    notifications::{
        Notification,
        NotificationCenter,
    },
    provider::{
        HttpTransport,
        Receipt,
        RpcProvider,
    },
    ui,
    wallets::{
        WalletContext,
        WalletSource,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::ContractAddresses;
use raffle_abi::{
    Address,
    TxHash,
    format_ether,
};
use std::{
    path::Path,
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIRMATIONS: u64 = 1;
const UI_TICK: Duration = Duration::from_millis(100);
const MAX_ERRORS: usize = 50;
const VISIBLE_ERRORS: usize = 5;

/// Last values read from the contract. Zero until the first successful read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub entrance_fee: u128,
    pub number_of_players: u64,
    pub recent_winner: Option<Address>,
}

impl DisplayState {
    pub fn entrance_fee_text(&self) -> String {
        format!("{} ETH", format_ether(self.entrance_fee))
    }

    pub fn number_of_players_text(&self) -> String {
        self.number_of_players.to_string()
    }

    pub fn recent_winner_text(&self) -> String {
        match self.recent_winner {
            Some(winner) => winner.to_string(),
            None => String::from("0"),
        }
    }
}

impl From<RaffleSnapshot> for DisplayState {
    fn from(snapshot: RaffleSnapshot) -> Self {
        Self {
            entrance_fee: snapshot.entrance_fee,
            number_of_players: snapshot.number_of_players,
            recent_winner: Some(snapshot.recent_winner),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewState {
    /// No deployment on the active chain.
    NoContract { prompt: String },
    Raffle {
        address: Address,
        display: DisplayState,
    },
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub view: ViewState,
    pub network: String,
    pub account: Option<Address>,
    pub connected: bool,
    pub busy: bool,
    pub refreshing: bool,
    pub pending_tx: Option<TxHash>,
    pub status: String,
    pub errors: Vec<String>,
    pub notifications: Vec<Notification>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TxState {
    Idle,
    Submitting,
    Pending(TxHash),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    pub raffle: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnterTicket {
    pub raffle: Address,
    pub from: Address,
    pub value: u128,
}

/// What the caller has to do after a wallet context update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletChange {
    Unchanged,
    /// Chain switched away or wallet disconnected: drop in-flight reads.
    Reset,
    /// Newly connected (or switched) to a chain with a deployment.
    Refresh,
}

pub struct AppController {
    addresses: ContractAddresses,
    preferred_account: Option<Address>,
    confirmations: u64,
    wallet: WalletContext,
    last_wallet_error: Option<String>,
    display: DisplayState,
    fee_loaded: bool,
    refresh_generation: u64,
    refreshing: bool,
    tx: TxState,
    status: String,
    errors: Vec<String>,
    notifications: NotificationCenter,
}

impl AppController {
    pub fn new(
        addresses: ContractAddresses,
        preferred_account: Option<Address>,
        confirmations: u64,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            addresses,
            preferred_account,
            confirmations: confirmations.max(1),
            wallet: WalletContext::disconnected(),
            last_wallet_error: None,
            display: DisplayState::default(),
            fee_loaded: false,
            refresh_generation: 0,
            refreshing: false,
            tx: TxState::Idle,
            status: String::from("Waiting for wallet..."),
            errors: Vec::new(),
            notifications,
        }
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    pub fn wallet(&self) -> &WalletContext {
        &self.wallet
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_busy(&self) -> bool {
        self.tx != TxState::Idle
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// First deployment recorded for the active chain.
    pub fn raffle_address(&self) -> Option<Address> {
        self.wallet
            .chain_id
            .and_then(|chain_id| self.addresses.resolve(chain_id))
    }

    pub fn apply_wallet_context(&mut self, ctx: WalletContext) -> WalletChange {
        self.last_wallet_error = None;
        if ctx == self.wallet {
            return WalletChange::Unchanged;
        }
        let was_connected = self.wallet.is_connected();
        let chain_changed = ctx.chain_id != self.wallet.chain_id;
        self.wallet = ctx;
        let connected = self.wallet.is_connected();

        if chain_changed || (was_connected && !connected) {
            self.reset_display();
        }

        if connected && (!was_connected || chain_changed) {
            let account = self
                .wallet
                .select_account(self.preferred_account)
                .map(|a| a.to_string())
                .unwrap_or_else(|| String::from("(configured account not exposed)"));
            info!(network = %self.wallet.network_label(), %account, "wallet connected");
            self.set_status(format!(
                "Connected to {} as {}",
                self.wallet.network_label(),
                account
            ));
            if self.raffle_address().is_some() {
                return WalletChange::Refresh;
            }
            return WalletChange::Reset;
        }

        if was_connected && !connected {
            info!("wallet disconnected");
            self.set_status("Wallet disconnected");
            return WalletChange::Reset;
        }

        if chain_changed {
            return WalletChange::Reset;
        }
        WalletChange::Unchanged
    }

    /// Provider unreachable: treated as a disconnect. The same failure is
    /// only reported once.
    pub fn wallet_unavailable(&mut self, err: RaffleError) -> WalletChange {
        let message = format!("Wallet provider unavailable: {err}");
        let repeated = self.last_wallet_error.as_deref() == Some(message.as_str());
        let change = self.apply_wallet_context(WalletContext::disconnected());
        if !repeated {
            warn!(error = %err, "wallet context poll failed");
            self.push_errors(vec![message.clone()]);
        }
        self.last_wallet_error = Some(message);
        change
    }

    fn reset_display(&mut self) {
        self.cancel_refresh();
        self.display = DisplayState::default();
        self.fee_loaded = false;
    }

    /// Invalidates every outstanding refresh.
    pub fn cancel_refresh(&mut self) {
        self.refresh_generation += 1;
        self.refreshing = false;
    }

    /// Starts a read of the raffle state, superseding any earlier one.
    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        let raffle = self.raffle_address()?;
        self.refresh_generation += 1;
        self.refreshing = true;
        Some(RefreshTicket {
            generation: self.refresh_generation,
            raffle,
        })
    }

    /// Applies a read result. Returns false for superseded results.
    pub fn finish_refresh(
        &mut self,
        generation: u64,
        result: Result<RaffleSnapshot, RaffleError>,
    ) -> bool {
        if generation != self.refresh_generation {
            debug!(generation, current = self.refresh_generation, "discarding stale refresh");
            return false;
        }
        self.refreshing = false;
        match result {
            Ok(snapshot) => {
                self.display = snapshot.into();
                self.fee_loaded = true;
            }
            Err(err) => {
                error!(error = %err, "reading raffle state failed");
                self.push_errors(vec![format!(
                    "Failed to read raffle state ({}): {err}. Press r to retry.",
                    err.kind()
                )]);
            }
        }
        true
    }

    /// Checks the preconditions for `enterRaffle` and marks the action busy.
    pub fn begin_enter(&mut self) -> Result<EnterTicket, RaffleError> {
        let ticket = self.enter_ticket();
        match ticket {
            Ok(ticket) => {
                self.tx = TxState::Submitting;
                self.set_status(format!(
                    "Entering raffle with {}...",
                    self.display.entrance_fee_text()
                ));
                Ok(ticket)
            }
            Err(err) => {
                self.push_errors(vec![format!("Cannot enter raffle: {err}")]);
                Err(err)
            }
        }
    }

    fn enter_ticket(&self) -> Result<EnterTicket, RaffleError> {
        if self.is_busy() {
            return Err(RaffleError::TransactionPending);
        }
        let raffle = self.raffle_address().ok_or(RaffleError::NoContract)?;
        let from = self
            .wallet
            .select_account(self.preferred_account)
            .ok_or(RaffleError::NotConnected)?;
        if !self.fee_loaded {
            return Err(RaffleError::FeeUnknown);
        }
        Ok(EnterTicket {
            raffle,
            from,
            value: self.display.entrance_fee,
        })
    }

    pub fn tx_submitted(&mut self, tx_hash: TxHash) {
        self.tx = TxState::Pending(tx_hash);
        let blocks = if self.confirmations == 1 {
            String::from("1 confirmation")
        } else {
            format!("{} confirmations", self.confirmations)
        };
        self.set_status(format!(
            "Transaction {} submitted; waiting for {blocks}...",
            tx_hash.short()
        ));
    }

    /// Raises the notification and returns the follow-up refresh.
    pub fn tx_confirmed(&mut self, receipt: Receipt) -> Option<RefreshTicket> {
        self.tx = TxState::Idle;
        info!(tx_hash = %receipt.tx_hash, block = receipt.block_number, "enterRaffle confirmed");
        self.notifications
            .dispatch(Notification::transaction_complete());
        self.set_status(format!(
            "Entered raffle in block {} ({})",
            receipt.block_number,
            receipt.tx_hash.short()
        ));
        self.begin_refresh()
    }

    pub fn tx_failed(&mut self, err: RaffleError) {
        self.tx = TxState::Idle;
        error!(error = %err, "enterRaffle failed");
        let message = match &err {
            RaffleError::UserRejected => String::from("Transaction cancelled in wallet"),
            other => format!("Enter raffle failed ({}): {other}", other.kind()),
        };
        self.push_errors(vec![message]);
    }

    pub fn dismiss_notification(&mut self) -> bool {
        self.notifications.dismiss_latest()
    }

    pub fn prune_notifications(&mut self, now: Instant) -> bool {
        self.notifications.prune(now)
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let view = match self.raffle_address() {
            Some(address) => ViewState::Raffle {
                address,
                display: self.display.clone(),
            },
            None => ViewState::NoContract {
                prompt: self.addresses.connect_prompt(),
            },
        };
        let pending_tx = match self.tx {
            TxState::Pending(hash) => Some(hash),
            _ => None,
        };
        AppSnapshot {
            view,
            network: self.wallet.network_label(),
            account: self.wallet.select_account(self.preferred_account),
            connected: self.wallet.is_connected(),
            busy: self.is_busy(),
            refreshing: self.refreshing,
            pending_tx,
            status: self.status.clone(),
            errors: self.errors.iter().rev().take(VISIBLE_ERRORS).cloned().collect(),
            notifications: self.notifications.visible(),
        }
    }
}

#[derive(Debug)]
pub enum WorkerEvent {
    Wallet(Result<WalletContext, RaffleError>),
    Refreshed {
        generation: u64,
        result: Result<RaffleSnapshot, RaffleError>,
    },
    TxSubmitted(TxHash),
    TxConfirmed(Receipt),
    TxFailed(RaffleError),
}

/// Background tasks that talk to the provider and report back over the
/// event channel.
pub struct Workers<C, W> {
    contract: Arc<C>,
    wallet: Arc<W>,
    confirmations: u64,
    events: mpsc::UnboundedSender<WorkerEvent>,
    refresh: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

impl<C: RaffleContract, W: WalletSource> Workers<C, W> {
    pub fn new(
        contract: Arc<C>,
        wallet: Arc<W>,
        confirmations: u64,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Self {
        Self {
            contract,
            wallet,
            confirmations,
            events,
            refresh: None,
            poller: None,
        }
    }

    /// Runs the three reads. Aborts the previous refresh task if it is still
    /// running.
    pub fn spawn_refresh(&mut self, ticket: RefreshTicket) {
        self.cancel_refresh();
        let contract = self.contract.clone();
        let events = self.events.clone();
        self.refresh = Some(tokio::spawn(async move {
            let result = read_snapshot(&*contract, ticket.raffle).await;
            let _ = events.send(WorkerEvent::Refreshed {
                generation: ticket.generation,
                result,
            });
        }));
    }

    pub fn cancel_refresh(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.abort();
        }
    }

    pub fn spawn_enter(&self, ticket: EnterTicket) {
        let contract = self.contract.clone();
        let events = self.events.clone();
        let confirmations = self.confirmations;
        tokio::spawn(async move {
            let tx_hash = match contract
                .enter_raffle(ticket.raffle, ticket.from, ticket.value)
                .await
            {
                Ok(tx_hash) => tx_hash,
                Err(err) => {
                    let _ = events.send(WorkerEvent::TxFailed(err));
                    return;
                }
            };
            let _ = events.send(WorkerEvent::TxSubmitted(tx_hash));
            let event = match contract.wait_for_confirmation(tx_hash, confirmations).await {
                Ok(receipt) => WorkerEvent::TxConfirmed(receipt),
                Err(err) => WorkerEvent::TxFailed(err),
            };
            let _ = events.send(event);
        });
    }

    pub fn spawn_connect(&self) {
        let wallet = self.wallet.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let ctx = wallet.connect().await;
            let _ = events.send(WorkerEvent::Wallet(ctx));
        });
    }

    /// Polls the wallet context until the event receiver goes away.
    pub fn start_wallet_poller(&mut self, interval: Duration) {
        let wallet = self.wallet.clone();
        let events = self.events.clone();
        self.poller = Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let ctx = wallet.wallet_context().await;
                if events.send(WorkerEvent::Wallet(ctx)).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn shutdown(&mut self) {
        self.cancel_refresh();
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}

fn apply_wallet_change<C: RaffleContract, W: WalletSource>(
    controller: &mut AppController,
    workers: &mut Workers<C, W>,
    change: WalletChange,
) {
    match change {
        WalletChange::Unchanged => {}
        WalletChange::Reset => workers.cancel_refresh(),
        WalletChange::Refresh => {
            if let Some(ticket) = controller.begin_refresh() {
                workers.spawn_refresh(ticket);
            }
        }
    }
}

pub fn handle_worker_event<C: RaffleContract, W: WalletSource>(
    controller: &mut AppController,
    workers: &mut Workers<C, W>,
    event: WorkerEvent,
) {
    match event {
        WorkerEvent::Wallet(Ok(ctx)) => {
            let change = controller.apply_wallet_context(ctx);
            apply_wallet_change(controller, workers, change);
        }
        WorkerEvent::Wallet(Err(err)) => {
            let change = controller.wallet_unavailable(err);
            apply_wallet_change(controller, workers, change);
        }
        WorkerEvent::Refreshed { generation, result } => {
            controller.finish_refresh(generation, result);
        }
        WorkerEvent::TxSubmitted(tx_hash) => controller.tx_submitted(tx_hash),
        WorkerEvent::TxConfirmed(receipt) => {
            if let Some(ticket) = controller.tx_confirmed(receipt) {
                workers.spawn_refresh(ticket);
            }
        }
        WorkerEvent::TxFailed(err) => controller.tx_failed(err),
    }
}

pub fn handle_user_event<C: RaffleContract, W: WalletSource>(
    controller: &mut AppController,
    workers: &mut Workers<C, W>,
    event: ui::UserEvent,
) {
    match event {
        ui::UserEvent::EnterRaffle => {
            if let Ok(ticket) = controller.begin_enter() {
                workers.spawn_enter(ticket);
            }
        }
        ui::UserEvent::Refresh => match controller.begin_refresh() {
            Some(ticket) => workers.spawn_refresh(ticket),
            None => controller.push_errors(vec![String::from(
                "Nothing to refresh: no raffle deployed on this network",
            )]),
        },
        ui::UserEvent::Connect => workers.spawn_connect(),
        ui::UserEvent::DismissNotification => {
            controller.dismiss_notification();
        }
        ui::UserEvent::Quit | ui::UserEvent::Redraw => {}
    }
}

pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, "lottery-entrance.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lottery_entrance=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let addresses = ContractAddresses::load(&config.addresses_file)
        .map_err(|e| eyre!("{e:#}"))?;
    info!(
        rpc_url = %config.rpc_url,
        chains = ?addresses.supported_chains().collect::<Vec<_>>(),
        "loaded contract address table"
    );
    let transport = HttpTransport::new(config.rpc_url.clone())?;
    let provider = Arc::new(RpcProvider::new(
        transport,
        config.poll_interval,
        config.confirmation_timeout,
    ));
    let controller = AppController::new(
        addresses,
        config.preferred_account,
        config.confirmations,
        NotificationCenter::new(config.notification_ttl),
    );

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(controller, provider, &config, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    mut controller: AppController,
    provider: Arc<RpcProvider<HttpTransport>>,
    config: &AppConfig,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut workers = Workers::new(
        provider.clone(),
        provider,
        controller.confirmations(),
        event_tx,
    );
    if config.request_accounts {
        workers.spawn_connect();
    }
    workers.start_wallet_poller(config.poll_interval);

    let mut ticker = time::interval(UI_TICK);
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    let res = loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    warn!("worker channel closed");
                    break Ok(());
                };
                handle_worker_event(&mut controller, &mut workers, event);
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after worker event failed")?;
            }
            _ = ticker.tick() => {
                let expired = controller.prune_notifications(Instant::now());
                let animating = controller.is_busy() || controller.is_refreshing();
                if animating {
                    ui_state.advance_spinner();
                }
                if expired || animating {
                    ui::draw(ui_state, &controller.snapshot())
                        .wrap_err("draw on tick failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break Ok(());
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = match raw_ev {
                    Ok(event) => event,
                    Err(err) => break Err(err),
                };
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if matches!(ev, ui::UserEvent::Quit) {
                    break Ok(());
                }
                handle_user_event(&mut controller, &mut workers, ev);
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after user input failed")?;
            }
        }
    };
    workers.shutdown();
    res
}
