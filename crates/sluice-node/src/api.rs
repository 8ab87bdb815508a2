//! HTTP API server for the Sluice node.
//!
//! Reads are answered directly from the engine; every mutation is sent to
//! the command loop and awaited.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;

use sluice_channels::{Channel, Htlc, NetworkStats, Settlement};
use sluice_core::{AccountId, Amount, ChannelError, ChannelId, HtlcId, PaymentHash, Preimage};

use crate::commands::{NodeCommand, Reply, SentPayment};
use crate::state::NodeState;

// --- Errors ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug)]
pub enum ApiError {
    Channel(ChannelError),
    BadRequest(String),
    Unavailable(&'static str),
}

impl From<ChannelError> for ApiError {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

/// HTTP status for each engine error.
pub fn status_for(e: &ChannelError) -> StatusCode {
    match e {
        ChannelError::NotAuthorized(_) | ChannelError::NotRegistered(_) => StatusCode::FORBIDDEN,
        ChannelError::ChannelNotFound(_)
        | ChannelError::InvalidHtlc(_)
        | ChannelError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
        ChannelError::ChannelClosed(_)
        | ChannelError::ChannelAlreadyExists { .. }
        | ChannelError::AlreadyJoined(_)
        | ChannelError::InvalidState(_)
        | ChannelError::HtlcExpired(_)
        | ChannelError::HtlcNotExpired(_) => StatusCode::CONFLICT,
        ChannelError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ChannelError::BelowMinimumDeposit { .. }
        | ChannelError::InvalidParameters(_)
        | ChannelError::InvalidRoute(_)
        | ChannelError::SelfPayment(_)
        | ChannelError::IncorrectPreimage(_) => StatusCode::BAD_REQUEST,
        ChannelError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Channel(e) => (
                status_for(&e),
                ErrorResponse {
                    error: e.to_string(),
                    kind: e.kind().into(),
                },
            ),
            Self::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error,
                    kind: "BadRequest".into(),
                },
            ),
            Self::Unavailable(error) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: error.into(),
                    kind: "Unavailable".into(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Send a command to the loop and wait for its reply.
async fn dispatch<T>(
    state: &NodeState,
    build: impl FnOnce(Reply<T>) -> NodeCommand,
) -> Result<T, ApiError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .command_tx
        .send(build(reply_tx))
        .await
        .map_err(|_| ApiError::Unavailable("node command loop not running"))?;
    reply_rx
        .await
        .map_err(|_| ApiError::Unavailable("command loop dropped the reply channel"))?
        .map_err(ApiError::from)
}

// --- Request / response types ---

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub now: u64,
    pub rail: String,
    pub escrow_account: AccountId,
    pub stats: NetworkStats,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub account: AccountId,
}

#[derive(Serialize, Deserialize)]
pub struct DeactivateResponse {
    pub account: AccountId,
    pub deactivated: bool,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account: AccountId,
    pub created: bool,
}

#[derive(Deserialize)]
pub struct OpenChannelRequest {
    pub initiator: AccountId,
    pub counterparty: AccountId,
    pub deposit: Amount,
}

#[derive(Serialize, Deserialize)]
pub struct ChannelIdResponse {
    pub channel_id: ChannelId,
}

#[derive(Deserialize)]
pub struct ChannelQuery {
    pub account: Option<AccountId>,
    pub a: Option<AccountId>,
    pub b: Option<AccountId>,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub counterparty: AccountId,
    pub deposit: Amount,
}

#[derive(Deserialize)]
pub struct PayRequest {
    pub payer: AccountId,
    pub amount: Amount,
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: AccountId,
}

#[derive(Deserialize)]
pub struct CreateHtlcRequest {
    pub channel_id: ChannelId,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: Amount,
    pub hashlock: PaymentHash,
    #[serde(default)]
    pub timelock: Option<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct HtlcIdResponse {
    pub htlc_id: HtlcId,
}

#[derive(Deserialize)]
pub struct RevealRequest {
    pub caller: AccountId,
    pub preimage: Preimage,
}

#[derive(Deserialize)]
pub struct SendPaymentRequest {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: Amount,
    #[serde(default)]
    pub secret: Option<Preimage>,
}

#[derive(Serialize, Deserialize)]
pub struct PreimageResponse {
    pub preimage: Preimage,
}

#[derive(Deserialize)]
pub struct FeeRateRequest {
    pub caller: AccountId,
    pub fee_rate_bps: u32,
}

#[derive(Serialize, Deserialize)]
pub struct FeeRateResponse {
    pub previous: u32,
    pub fee_rate_bps: u32,
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub caller: AccountId,
    pub to: AccountId,
}

#[derive(Deserialize)]
pub struct MintRequest {
    pub caller: AccountId,
    pub account: AccountId,
    pub amount: Amount,
}

#[derive(Serialize, Deserialize)]
pub struct AmountResponse {
    pub amount: Amount,
}

#[derive(Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: AccountId,
    pub balance: Amount,
}

#[derive(Deserialize)]
pub struct AdvanceRequest {
    pub ticks: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ClockResponse {
    pub now: u64,
}

// --- Read handlers ---

async fn handle_status(State(state): State<Arc<NodeState>>) -> Json<StatusResponse> {
    let services = &state.services;
    let ledger = services.engine.ledger();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        now: services.clock.now(),
        rail: "vt-internal".into(),
        escrow_account: ledger.config().escrow_account.clone(),
        stats: services.engine.stats(),
    })
}

async fn handle_stats(State(state): State<Arc<NodeState>>) -> Json<NetworkStats> {
    Json(state.services.engine.stats())
}

async fn handle_list_participants(
    State(state): State<Arc<NodeState>>,
) -> Json<Vec<sluice_channels::adapters::Participant>> {
    Json(state.services.registry.list())
}

async fn handle_get_channel(
    State(state): State<Arc<NodeState>>,
    Path(channel_id): Path<ChannelId>,
) -> ApiResult<Channel> {
    state
        .services
        .engine
        .ledger()
        .channel(channel_id)
        .map(Json)
        .ok_or(ApiError::Channel(ChannelError::ChannelNotFound(channel_id)))
}

async fn handle_list_channels(
    State(state): State<Arc<NodeState>>,
    Query(query): Query<ChannelQuery>,
) -> ApiResult<Vec<Channel>> {
    let ledger = state.services.engine.ledger();
    match query {
        ChannelQuery {
            a: Some(a),
            b: Some(b),
            ..
        } => Ok(Json(ledger.channel_between(&a, &b).into_iter().collect())),
        ChannelQuery {
            account: Some(account),
            ..
        } => Ok(Json(ledger.channels_of(&account))),
        _ => Err(ApiError::BadRequest(
            "query needs either `account` or both `a` and `b`".into(),
        )),
    }
}

async fn handle_channel_htlcs(
    State(state): State<Arc<NodeState>>,
    Path(channel_id): Path<ChannelId>,
) -> ApiResult<Vec<Htlc>> {
    let engine = &state.services.engine;
    if engine.ledger().channel(channel_id).is_none() {
        return Err(ChannelError::ChannelNotFound(channel_id).into());
    }
    Ok(Json(engine.htlcs_for_channel(channel_id)))
}

async fn handle_get_htlc(
    State(state): State<Arc<NodeState>>,
    Path(htlc_id): Path<HtlcId>,
) -> ApiResult<Htlc> {
    state
        .services
        .engine
        .get(htlc_id)
        .map(Json)
        .ok_or(ApiError::Channel(ChannelError::InvalidHtlc(htlc_id)))
}

async fn handle_balance(
    State(state): State<Arc<NodeState>>,
    Path(account): Path<AccountId>,
) -> Json<BalanceResponse> {
    let balance = state.services.rail.balance_of(&account);
    Json(BalanceResponse { account, balance })
}

// --- Command handlers ---

async fn handle_register(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let account = req.account;
    if account.as_str().trim().is_empty() {
        return Err(ApiError::BadRequest("account must not be empty".into()));
    }
    let created = dispatch(&state, |reply| NodeCommand::RegisterParticipant {
        account: account.clone(),
        reply,
    })
    .await?;
    Ok(Json(RegisterResponse { account, created }))
}

async fn handle_deactivate(
    State(state): State<Arc<NodeState>>,
    Path(account): Path<AccountId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<DeactivateResponse> {
    let deactivated = dispatch(&state, |reply| NodeCommand::DeactivateParticipant {
        caller: req.caller,
        account: account.clone(),
        reply,
    })
    .await?;
    Ok(Json(DeactivateResponse {
        account,
        deactivated,
    }))
}

async fn handle_open_channel(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<OpenChannelRequest>,
) -> ApiResult<ChannelIdResponse> {
    let channel_id = dispatch(&state, |reply| NodeCommand::OpenChannel {
        initiator: req.initiator,
        counterparty: req.counterparty,
        deposit: req.deposit,
        reply,
    })
    .await?;
    Ok(Json(ChannelIdResponse { channel_id }))
}

async fn handle_join_channel(
    State(state): State<Arc<NodeState>>,
    Path(channel_id): Path<ChannelId>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<Channel> {
    dispatch(&state, |reply| NodeCommand::JoinChannel {
        channel_id,
        counterparty: req.counterparty,
        deposit: req.deposit,
        reply,
    })
    .await?;
    handle_get_channel(State(state), Path(channel_id)).await
}

async fn handle_pay(
    State(state): State<Arc<NodeState>>,
    Path(channel_id): Path<ChannelId>,
    Json(req): Json<PayRequest>,
) -> ApiResult<Channel> {
    dispatch(&state, |reply| NodeCommand::Pay {
        channel_id,
        payer: req.payer,
        amount: req.amount,
        reply,
    })
    .await?;
    handle_get_channel(State(state), Path(channel_id)).await
}

async fn handle_close_channel(
    State(state): State<Arc<NodeState>>,
    Path(channel_id): Path<ChannelId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<Settlement> {
    let settlement = dispatch(&state, |reply| NodeCommand::CloseChannel {
        channel_id,
        caller: req.caller,
        reply,
    })
    .await?;
    Ok(Json(settlement))
}

async fn handle_create_htlc(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<CreateHtlcRequest>,
) -> ApiResult<HtlcIdResponse> {
    let htlc_id = dispatch(&state, |reply| NodeCommand::CreateHtlc {
        channel_id: req.channel_id,
        sender: req.sender,
        receiver: req.receiver,
        amount: req.amount,
        hashlock: req.hashlock,
        timelock: req.timelock,
        reply,
    })
    .await?;
    Ok(Json(HtlcIdResponse { htlc_id }))
}

async fn handle_fulfill_htlc(
    State(state): State<Arc<NodeState>>,
    Path(htlc_id): Path<HtlcId>,
    Json(req): Json<RevealRequest>,
) -> ApiResult<Htlc> {
    dispatch(&state, |reply| NodeCommand::FulfillHtlc {
        htlc_id,
        caller: req.caller,
        preimage: req.preimage,
        reply,
    })
    .await?;
    handle_get_htlc(State(state), Path(htlc_id)).await
}

async fn handle_refund_htlc(
    State(state): State<Arc<NodeState>>,
    Path(htlc_id): Path<HtlcId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<Htlc> {
    dispatch(&state, |reply| NodeCommand::RefundHtlc {
        htlc_id,
        caller: req.caller,
        reply,
    })
    .await?;
    handle_get_htlc(State(state), Path(htlc_id)).await
}

async fn handle_send_payment(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<SendPaymentRequest>,
) -> ApiResult<SentPayment> {
    let sent = dispatch(&state, |reply| NodeCommand::SendPayment {
        sender: req.sender,
        receiver: req.receiver,
        amount: req.amount,
        secret: req.secret,
        reply,
    })
    .await?;
    Ok(Json(sent))
}

async fn handle_complete_payment(
    State(state): State<Arc<NodeState>>,
    Path(htlc_id): Path<HtlcId>,
    Json(req): Json<RevealRequest>,
) -> ApiResult<PreimageResponse> {
    let preimage = dispatch(&state, |reply| NodeCommand::CompletePayment {
        htlc_id,
        caller: req.caller,
        preimage: req.preimage,
        reply,
    })
    .await?;
    Ok(Json(PreimageResponse { preimage }))
}

async fn handle_set_fee_rate(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<FeeRateRequest>,
) -> ApiResult<FeeRateResponse> {
    let fee_rate_bps = req.fee_rate_bps;
    let previous = dispatch(&state, |reply| NodeCommand::SetFeeRate {
        caller: req.caller,
        fee_rate_bps,
        reply,
    })
    .await?;
    Ok(Json(FeeRateResponse {
        previous,
        fee_rate_bps,
    }))
}

async fn handle_withdraw_fees(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<WithdrawRequest>,
) -> ApiResult<AmountResponse> {
    let amount = dispatch(&state, |reply| NodeCommand::WithdrawFees {
        caller: req.caller,
        to: req.to,
        reply,
    })
    .await?;
    Ok(Json(AmountResponse { amount }))
}

async fn handle_mint(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<MintRequest>,
) -> ApiResult<BalanceResponse> {
    let account = req.account;
    let balance = dispatch(&state, |reply| NodeCommand::Mint {
        caller: req.caller,
        account: account.clone(),
        amount: req.amount,
        reply,
    })
    .await?;
    Ok(Json(BalanceResponse { account, balance }))
}

async fn handle_advance_clock(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<AdvanceRequest>,
) -> ApiResult<ClockResponse> {
    let now = dispatch(&state, |reply| NodeCommand::AdvanceClock {
        ticks: req.ticks,
        reply,
    })
    .await?;
    Ok(Json(ClockResponse { now }))
}

// --- Server ---

/// Routes of the JSON API.
///
/// Callers are identified by the `caller` (or role) field of each request and
/// are trusted as given, including for admin routes. Expose the API only
/// behind a proxy that authenticates the caller and enforces that field.
pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/stats", get(handle_stats))
        .route(
            "/api/v1/participants",
            get(handle_list_participants).post(handle_register),
        )
        .route(
            "/api/v1/participants/{account}/deactivate",
            post(handle_deactivate),
        )
        .route(
            "/api/v1/channels",
            get(handle_list_channels).post(handle_open_channel),
        )
        .route("/api/v1/channels/{id}", get(handle_get_channel))
        .route("/api/v1/channels/{id}/join", post(handle_join_channel))
        .route("/api/v1/channels/{id}/pay", post(handle_pay))
        .route("/api/v1/channels/{id}/close", post(handle_close_channel))
        .route("/api/v1/channels/{id}/htlcs", get(handle_channel_htlcs))
        .route("/api/v1/htlcs", post(handle_create_htlc))
        .route("/api/v1/htlcs/{id}", get(handle_get_htlc))
        .route("/api/v1/htlcs/{id}/fulfill", post(handle_fulfill_htlc))
        .route("/api/v1/htlcs/{id}/refund", post(handle_refund_htlc))
        .route("/api/v1/payments", post(handle_send_payment))
        .route(
            "/api/v1/payments/{id}/complete",
            post(handle_complete_payment),
        )
        .route("/api/v1/admin/fee-rate", post(handle_set_fee_rate))
        .route("/api/v1/admin/withdraw", post(handle_withdraw_fees))
        .route("/api/v1/admin/mint", post(handle_mint))
        .route("/api/v1/accounts/{account}/balance", get(handle_balance))
        .route("/api/v1/clock/advance", post(handle_advance_clock))
        .with_state(state)
}

pub async fn serve(listener: tokio::net::TcpListener, state: Arc<NodeState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listen_addr = listener.local_addr()?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
