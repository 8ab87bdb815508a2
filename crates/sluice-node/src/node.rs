//! The Sluice node orchestrator.
//!
//! Builds the channel engine over the in-memory rail, applies every mutation
//! through one command loop, and serves the HTTP API.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use sluice_channels::{
    Clock, HtlcEngine, InMemoryRegistry, InternalTransfer, ManualClock, SystemClock,
};
use sluice_core::{AccountId, Amount, ChannelError};
use sluice_crypto::PaymentSecret;
use sluice_routing::SingleHopRouter;

use crate::commands::{NodeCommand, SentPayment};
use crate::config::{ClockSource, SluiceConfig};
use crate::state::NodeState;

/// Capacity of the API → command loop channel.
const COMMAND_BUFFER: usize = 256;

/// The engine and its collaborators, shared between the command loop (writes)
/// and HTTP handlers (reads).
pub struct Services {
    pub rail: Arc<InternalTransfer>,
    pub registry: Arc<InMemoryRegistry>,
    pub clock: Arc<dyn Clock>,
    manual_clock: Option<Arc<ManualClock>>,
    pub engine: Arc<HtlcEngine>,
    pub router: SingleHopRouter,
}

impl Services {
    pub fn build(config: &SluiceConfig) -> Result<Self> {
        let rail = Arc::new(InternalTransfer::new());
        let registry = Arc::new(InMemoryRegistry::new());

        let (clock, manual_clock): (Arc<dyn Clock>, Option<Arc<ManualClock>>) =
            match config.clock.source {
                ClockSource::Manual => {
                    let manual = Arc::new(ManualClock::new(config.clock.start));
                    (manual.clone(), Some(manual))
                }
                ClockSource::System => (Arc::new(SystemClock), None),
            };

        for genesis in &config.rail.genesis {
            rail.credit(&genesis.account, genesis.balance)?;
            if genesis.register {
                registry.register(genesis.account.clone());
            }
            tracing::info!(account = %genesis.account, balance = genesis.balance, "genesis account funded");
        }

        let ledger = Arc::new(sluice_channels::ChannelLedger::new(
            config.engine.clone(),
            rail.clone(),
            registry.clone(),
            clock.clone(),
        )?);
        let engine = Arc::new(HtlcEngine::new(ledger));
        let router = SingleHopRouter::new(engine.clone());

        Ok(Self {
            rail,
            registry,
            clock,
            manual_clock,
            engine,
            router,
        })
    }

    /// Drain commands until every sender is gone.
    pub async fn serve(self: Arc<Self>, mut command_rx: mpsc::Receiver<NodeCommand>) {
        tracing::info!("entering command loop");
        while let Some(cmd) = command_rx.recv().await {
            self.execute(cmd);
        }
        tracing::info!("API command channel closed");
    }

    /// Apply one command and send its reply.
    pub fn execute(&self, cmd: NodeCommand) {
        let name = cmd.name();
        tracing::debug!(command = name, "executing command");
        let ledger = self.engine.ledger();

        match cmd {
            NodeCommand::RegisterParticipant { account, reply } => {
                let _ = reply.send(Ok(self.registry.register(account)));
            }
            NodeCommand::DeactivateParticipant {
                caller,
                account,
                reply,
            } => {
                let result = self.deactivate(&caller, &account);
                Self::respond(name, reply, result);
            }
            NodeCommand::OpenChannel {
                initiator,
                counterparty,
                deposit,
                reply,
            } => {
                let result = ledger.open(&initiator, &counterparty, deposit);
                Self::respond(name, reply, result);
            }
            NodeCommand::JoinChannel {
                channel_id,
                counterparty,
                deposit,
                reply,
            } => {
                let result = ledger.join(channel_id, &counterparty, deposit);
                Self::respond(name, reply, result);
            }
            NodeCommand::Pay {
                channel_id,
                payer,
                amount,
                reply,
            } => {
                let result = ledger.pay(channel_id, &payer, amount);
                if result.is_ok() {
                    self.record_payment(&payer, ledger.channel(channel_id).and_then(|c| {
                        c.side_of(&payer).map(|side| c.participant(side.other()).clone())
                    }));
                }
                Self::respond(name, reply, result);
            }
            NodeCommand::CloseChannel {
                channel_id,
                caller,
                reply,
            } => {
                let result = ledger.close(channel_id, &caller);
                Self::respond(name, reply, result);
            }
            NodeCommand::CreateHtlc {
                channel_id,
                sender,
                receiver,
                amount,
                hashlock,
                timelock,
                reply,
            } => {
                let result = self.default_timelock(timelock).and_then(|timelock| {
                    self.engine
                        .create(channel_id, &sender, &receiver, amount, hashlock, timelock)
                });
                Self::respond(name, reply, result);
            }
            NodeCommand::FulfillHtlc {
                htlc_id,
                caller,
                preimage,
                reply,
            } => {
                let result = self.engine.fulfill(htlc_id, &caller, preimage.as_bytes());
                if result.is_ok() {
                    let sender = self.engine.get(htlc_id).map(|h| h.sender);
                    self.record_payment(&caller, sender);
                }
                Self::respond(name, reply, result);
            }
            NodeCommand::RefundHtlc {
                htlc_id,
                caller,
                reply,
            } => {
                let result = self.engine.refund(htlc_id, &caller);
                Self::respond(name, reply, result);
            }
            NodeCommand::SendPayment {
                sender,
                receiver,
                amount,
                secret,
                reply,
            } => {
                let result = self.send_payment(&sender, &receiver, amount, secret);
                Self::respond(name, reply, result);
            }
            NodeCommand::CompletePayment {
                htlc_id,
                caller,
                preimage,
                reply,
            } => {
                let result = self
                    .router
                    .complete_payment(htlc_id, &caller, preimage.as_bytes());
                if result.is_ok() {
                    let sender = self.engine.get(htlc_id).map(|h| h.sender);
                    self.record_payment(&caller, sender);
                }
                Self::respond(name, reply, result);
            }
            NodeCommand::SetFeeRate {
                caller,
                fee_rate_bps,
                reply,
            } => {
                let result = ledger.set_fee_rate(&caller, fee_rate_bps);
                Self::respond(name, reply, result);
            }
            NodeCommand::WithdrawFees { caller, to, reply } => {
                let result = ledger.withdraw_fees(&caller, &to);
                Self::respond(name, reply, result);
            }
            NodeCommand::Mint {
                caller,
                account,
                amount,
                reply,
            } => {
                let result = self.mint(&caller, &account, amount);
                Self::respond(name, reply, result);
            }
            NodeCommand::AdvanceClock { ticks, reply } => {
                let result = match &self.manual_clock {
                    Some(clock) => Ok(clock.advance(ticks)),
                    None => Err(ChannelError::InvalidState(
                        "node clock is not manual".into(),
                    )),
                };
                Self::respond(name, reply, result);
            }
        }
    }

    fn respond<T>(
        command: &'static str,
        reply: crate::commands::Reply<T>,
        result: Result<T, ChannelError>,
    ) {
        if let Err(ref e) = result {
            tracing::debug!(command, kind = e.kind(), error = %e, "command rejected");
        }
        if reply.send(result).is_err() {
            tracing::warn!(command, "caller dropped the reply channel");
        }
    }

    fn default_timelock(&self, timelock: Option<u64>) -> Result<u64, ChannelError> {
        match timelock {
            Some(t) => Ok(t),
            None => self
                .clock
                .now()
                .checked_add(self.engine.ledger().timelock_horizon())
                .ok_or_else(|| ChannelError::overflow("timelock")),
        }
    }

    fn send_payment(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Amount,
        secret: Option<sluice_core::Preimage>,
    ) -> Result<SentPayment, ChannelError> {
        let secret = secret.unwrap_or_else(|| PaymentSecret::generate().to_preimage());
        let route = self.router.find_route(sender, receiver, amount)?;
        let start = self
            .router
            .start_payment(sender, receiver, amount, &route, secret.as_bytes())?;
        Ok(SentPayment {
            route,
            start,
            secret,
        })
    }

    fn mint(
        &self,
        caller: &AccountId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Amount, ChannelError> {
        if caller != &self.engine.ledger().config().admin_account {
            return Err(ChannelError::NotAuthorized(caller.clone()));
        }
        let balance = self.rail.credit(account, amount)?;
        tracing::info!(account = %account, amount, balance, "rail account credited");
        Ok(balance)
    }

    /// Open channels are unaffected; the account can no longer open new ones.
    fn deactivate(&self, caller: &AccountId, account: &AccountId) -> Result<bool, ChannelError> {
        if caller != &self.engine.ledger().config().admin_account {
            return Err(ChannelError::NotAuthorized(caller.clone()));
        }
        Ok(self.registry.deactivate(account))
    }

    fn record_payment(&self, one: &AccountId, other: Option<AccountId>) {
        self.registry.record_payment(one);
        if let Some(other) = other {
            self.registry.record_payment(&other);
        }
    }
}

/// The full Sluice node.
pub struct SluiceNode {
    config: SluiceConfig,
    services: Arc<Services>,
    /// Shared state accessible from HTTP handlers.
    node_state: Option<Arc<NodeState>>,
    /// Receives commands from the HTTP API.
    command_rx: Option<mpsc::Receiver<NodeCommand>>,
}

impl SluiceNode {
    pub fn new(config: SluiceConfig) -> Result<Self> {
        let services = Arc::new(Services::build(&config)?);
        tracing::info!(
            rail = "vt-internal",
            clock = ?config.clock.source,
            "Sluice node created"
        );
        Ok(Self {
            config,
            services,
            node_state: None,
            command_rx: None,
        })
    }

    /// Create the command channel and start the HTTP API.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting Sluice node");

        let (command_tx, command_rx) = mpsc::channel::<NodeCommand>(COMMAND_BUFFER);
        let node_state = Arc::new(NodeState::new(self.services.clone(), command_tx));

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let listener = tokio::net::TcpListener::bind(api_addr).await?;
        let api_state = node_state.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::api::serve(listener, api_state).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        });

        self.node_state = Some(node_state);
        self.command_rx = Some(command_rx);
        Ok(())
    }

    /// Run the command loop until the API side goes away.
    pub async fn run(&mut self) -> Result<()> {
        let command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;
        self.services.clone().serve(command_rx).await;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down Sluice node");
        self.node_state = None;
        self.command_rx = None;
        let stats = self.services.engine.stats();
        tracing::info!(
            channels_open = stats.channels_open,
            htlcs_pending = stats.htlcs_pending,
            fee_pool = stats.fee_pool,
            "Sluice node shut down"
        );
        Ok(())
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }
}
