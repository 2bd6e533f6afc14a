//! HTTP API for the lancer daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Order lifecycle (create, list, assign, transition, history, delete)
//! - Bidding (submit, review loop, approve with sibling rejection)
//! - Earnings ledger (record, approval gate, release, cancel)
//! - Payouts and settlement (create, process, complete, sync, cancel, fail)
//! - Partner identity feed

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use lancer_domain::{
    Actor, Amount, Bid, BidId, DomainError, Earning, EarningId, Order, OrderId, OrderStatus,
    OrderStatusHistory, Partner, PartnerId, Payout, PayoutId, PayoutTimeline,
};
use lancer_engine::{Engine, EngineError, NewBid, NewEarning, NewOrder, NewPayout, Settlement};
use lancer_store::Store;

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S: Store + 'static> {
    pub engine: Arc<Engine<S>>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable reason code, present on validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Request to create an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    pub order: NewOrder,
    pub actor: Actor,
}

/// Filters for listing orders; `client` wins over `assigned_to` wins
/// over `status`.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<OrderStatus>,
    pub client: Option<PartnerId>,
    pub assigned_to: Option<PartnerId>,
}

/// Orders list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub count: usize,
    pub orders: Vec<Order>,
}

/// Request to hand an order directly to a freelancer.
#[derive(Debug, Deserialize)]
pub struct AssignOrderRequest {
    pub freelancer: PartnerId,
    #[serde(default)]
    pub bid_amount: Option<Decimal>,
    pub actor: Actor,
    #[serde(default)]
    pub note: Option<String>,
}

/// Request to drive one order status transition.
#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
    pub actor: Actor,
    #[serde(default)]
    pub note: Option<String>,
}

/// Order status history response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub history: Vec<OrderStatusHistory>,
}

/// Request to submit a bid; the order comes from the path.
#[derive(Debug, Deserialize)]
pub struct SubmitBidRequest {
    pub freelancer: PartnerId,
    pub amount: Decimal,
    pub estimated_hours: Decimal,
    pub proposal: String,
    pub actor: Actor,
}

/// Bids list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BidsResponse {
    pub count: usize,
    pub bids: Vec<Bid>,
}

/// Response after an approve: the winning bid and the reassigned order.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveBidResponse {
    pub bid: Bid,
    pub order: Order,
}

/// Request carrying only the acting party.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor: Actor,
}

/// Request carrying the acting party and a mandatory note.
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub actor: Actor,
    pub note: String,
}

/// Request carrying the acting party and a mandatory reason.
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub actor: Actor,
    pub reason: String,
}

/// Request to resubmit a bid after a revision request; omitted fields
/// keep their previous values.
#[derive(Debug, Deserialize)]
pub struct ResubmitBidRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub estimated_hours: Option<Decimal>,
    #[serde(default)]
    pub proposal: Option<String>,
    pub actor: Actor,
}

/// Request to record an earning.
#[derive(Debug, Deserialize)]
pub struct CreateEarningRequest {
    #[serde(flatten)]
    pub earning: NewEarning,
    pub actor: Actor,
}

/// Earnings list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct EarningsResponse {
    pub count: usize,
    pub earnings: Vec<Earning>,
}

/// Filter for a partner's earnings.
#[derive(Debug, Deserialize)]
pub struct EarningsQuery {
    /// Restrict to claimable earnings
    #[serde(default)]
    pub available: bool,
}

/// Identity-feed upsert payload.
#[derive(Debug, Deserialize)]
pub struct UpsertPartnerRequest {
    pub display_name: String,
    pub available: bool,
    pub actor: Actor,
}

/// Request to create a payout.
#[derive(Debug, Deserialize)]
pub struct CreatePayoutRequest {
    #[serde(flatten)]
    pub payout: NewPayout,
    pub actor: Actor,
}

/// Payouts list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutsResponse {
    pub count: usize,
    pub payouts: Vec<Payout>,
}

/// Payment-rail completion callback payload.
#[derive(Debug, Deserialize)]
pub struct CompletePayoutRequest {
    pub transaction_id: String,
    pub actor: Actor,
}

/// Request to cancel a payout.
#[derive(Debug, Deserialize)]
pub struct CancelPayoutRequest {
    pub actor: Actor,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Payment-rail failure callback payload.
#[derive(Debug, Deserialize)]
pub struct FailPayoutRequest {
    pub actor: Actor,
    pub message: String,
}

/// Payout timeline response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub count: usize,
    pub timeline: Vec<PayoutTimeline>,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S>(state: Arc<ApiState<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/orders", post(create_order_handler))
        .route("/orders", get(list_orders_handler))
        .route("/orders/:id", get(get_order_handler))
        .route("/orders/:id", delete(delete_order_handler))
        .route("/orders/:id/assign", post(assign_order_handler))
        .route("/orders/:id/status", post(order_status_handler))
        .route("/orders/:id/history", get(order_history_handler))
        .route("/orders/:id/bids", post(submit_bid_handler))
        .route("/orders/:id/bids", get(list_bids_handler))
        .route("/bids/:id/approve", post(approve_bid_handler))
        .route("/bids/:id/reject", post(reject_bid_handler))
        .route("/bids/:id/review", post(review_bid_handler))
        .route("/bids/:id/revision", post(request_revision_handler))
        .route("/bids/:id/withdraw", post(withdraw_bid_handler))
        .route("/bids/:id/resubmit", post(resubmit_bid_handler))
        .route("/earnings", post(create_earning_handler))
        .route("/earnings/:id/approve", post(approve_earning_handler))
        .route("/earnings/:id/reject", post(reject_earning_handler))
        .route("/earnings/:id/release", post(release_earning_handler))
        .route("/earnings/:id/cancel", post(cancel_earning_handler))
        .route("/partners/:id", put(upsert_partner_handler))
        .route("/partners/:id", get(get_partner_handler))
        .route("/partners/:id/earnings", get(partner_earnings_handler))
        .route("/partners/:id/payouts", get(partner_payouts_handler))
        .route("/payouts", post(create_payout_handler))
        .route("/payouts/:id", get(get_payout_handler))
        .route("/payouts/:id/process", post(process_payout_handler))
        .route("/payouts/:id/complete", post(complete_payout_handler))
        .route("/payouts/:id/sync", post(sync_payout_handler))
        .route("/payouts/:id/cancel", post(cancel_payout_handler))
        .route("/payouts/:id/fail", post(fail_payout_handler))
        .route("/payouts/:id/timeline", get(payout_timeline_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create an order.
async fn create_order_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let order = state
        .engine
        .create_order(req.order, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// List orders, narrowed by at most one filter.
async fn list_orders_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<OrdersResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let orders = if let Some(client) = query.client {
        state.engine.list_orders_for_client(&client).await
    } else if let Some(assignee) = query.assigned_to {
        state.engine.list_orders_for_assignee(&assignee).await
    } else {
        state.engine.list_orders(query.status).await
    }
    .map_err(to_error_response)?;

    Ok(Json(OrdersResponse {
        count: orders.len(),
        orders,
    }))
}

/// Get a single order.
async fn get_order_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let order = state
        .engine
        .get_order(&OrderId::from(id))
        .await
        .map_err(to_error_response)?;

    Ok(Json(order))
}

/// Delete an order that was never charged and never assigned.
async fn delete_order_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    state
        .engine
        .delete_order(&OrderId::from(id), req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Hand an order directly to a freelancer, bypassing bidding.
async fn assign_order_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AssignOrderRequest>,
) -> Result<Json<Order>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let bid_amount = req.bid_amount.map(parse_amount).transpose()?;
    let order = state
        .engine
        .assign_order(
            &OrderId::from(id),
            req.freelancer,
            bid_amount,
            req.actor,
            req.note,
        )
        .await
        .map_err(to_error_response)?;

    Ok(Json(order))
}

/// Drive one order status transition.
async fn order_status_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<OrderStatusRequest>,
) -> Result<Json<Order>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let order = state
        .engine
        .transition_order(&OrderId::from(id), req.status, req.actor, req.note)
        .await
        .map_err(to_error_response)?;

    Ok(Json(order))
}

/// An order's status history, oldest first.
async fn order_history_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let history = state
        .engine
        .order_history(&OrderId::from(id))
        .await
        .map_err(to_error_response)?;

    Ok(Json(HistoryResponse {
        count: history.len(),
        history,
    }))
}

/// Submit a bid against an order.
async fn submit_bid_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitBidRequest>,
) -> Result<(StatusCode, Json<Bid>), (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let new = NewBid {
        order_id: OrderId::from(id),
        freelancer: req.freelancer,
        amount: parse_amount(req.amount)?,
        estimated_hours: req.estimated_hours,
        proposal: req.proposal,
    };
    let bid = state
        .engine
        .submit_bid(new, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok((StatusCode::CREATED, Json(bid)))
}

/// All bids on an order.
async fn list_bids_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BidsResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let bids = state
        .engine
        .list_bids(&OrderId::from(id))
        .await
        .map_err(to_error_response)?;

    Ok(Json(BidsResponse {
        count: bids.len(),
        bids,
    }))
}

/// Approve a bid; the order goes to the bidder and sibling pending bids
/// are rejected in the same operation.
async fn approve_bid_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<BidId>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<ApproveBidResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let (bid, order) = state
        .engine
        .approve_bid(&id, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(ApproveBidResponse { bid, order }))
}

/// Reject a bid with a note.
async fn reject_bid_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<BidId>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<Bid>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let bid = state
        .engine
        .reject_bid(&id, req.note, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(bid))
}

/// Park a bid under review.
async fn review_bid_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<BidId>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Bid>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let bid = state
        .engine
        .mark_bid_under_review(&id, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(bid))
}

/// Send a bid back to the freelancer for changes.
async fn request_revision_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<BidId>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<Bid>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let bid = state
        .engine
        .request_bid_revision(&id, req.note, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(bid))
}

/// Withdraw a bid.
async fn withdraw_bid_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<BidId>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Bid>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let bid = state
        .engine
        .withdraw_bid(&id, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(bid))
}

/// Resubmit a revised bid.
async fn resubmit_bid_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<BidId>,
    Json(req): Json<ResubmitBidRequest>,
) -> Result<Json<Bid>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let amount = req.amount.map(parse_amount).transpose()?;
    let bid = state
        .engine
        .resubmit_bid(&id, amount, req.estimated_hours, req.proposal, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(bid))
}

/// Record an earning (billing collaborator).
async fn create_earning_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Json(req): Json<CreateEarningRequest>,
) -> Result<(StatusCode, Json<Earning>), (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let earning = state
        .engine
        .create_earning(req.earning, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok((StatusCode::CREATED, Json(earning)))
}

/// Approve a gated earning.
async fn approve_earning_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<EarningId>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Earning>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let earning = state
        .engine
        .approve_earning(&id, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(earning))
}

/// Reject a gated earning with a reason.
async fn reject_earning_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<EarningId>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Earning>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let earning = state
        .engine
        .reject_earning(&id, req.reason, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(earning))
}

/// Release an earning for claiming.
async fn release_earning_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<EarningId>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Earning>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let earning = state
        .engine
        .release_earning(&id, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(earning))
}

/// Void an earning.
async fn cancel_earning_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<EarningId>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Earning>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let earning = state
        .engine
        .cancel_earning(&id, req.reason, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(earning))
}

/// Upsert a partner from the identity feed.
async fn upsert_partner_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<PartnerId>,
    Json(req): Json<UpsertPartnerRequest>,
) -> Result<Json<Partner>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let partner = state
        .engine
        .upsert_partner(id, req.display_name, req.available, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(partner))
}

/// Get a partner.
async fn get_partner_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<PartnerId>,
) -> Result<Json<Partner>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let partner = state
        .engine
        .get_partner(&id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(partner))
}

/// A partner's earnings; `?available=true` narrows to claimable ones.
async fn partner_earnings_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<PartnerId>,
    Query(query): Query<EarningsQuery>,
) -> Result<Json<EarningsResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    // Reads arrive through the platform gateway already authenticated.
    let earnings = if query.available {
        state.engine.available_earnings(&id, Actor::system()).await
    } else {
        state.engine.earnings_for_partner(&id, Actor::system()).await
    }
    .map_err(to_error_response)?;

    Ok(Json(EarningsResponse {
        count: earnings.len(),
        earnings,
    }))
}

/// A partner's payouts.
async fn partner_payouts_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<PartnerId>,
) -> Result<Json<PayoutsResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let payouts = state
        .engine
        .payouts_for_partner(&id, Actor::system())
        .await
        .map_err(to_error_response)?;

    Ok(Json(PayoutsResponse {
        count: payouts.len(),
        payouts,
    }))
}

/// Request a payout, optionally claiming earnings.
async fn create_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Json(req): Json<CreatePayoutRequest>,
) -> Result<(StatusCode, Json<Payout>), (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let payout = state
        .engine
        .create_payout(req.payout, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok((StatusCode::CREATED, Json(payout)))
}

/// Get a single payout.
async fn get_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Payout>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let payout = state
        .engine
        .get_payout(&PayoutId::from(id))
        .await
        .map_err(to_error_response)?;

    Ok(Json(payout))
}

/// Hand a payout to the payment rail.
async fn process_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Payout>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let payout = state
        .engine
        .process_payout(&PayoutId::from(id), req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(payout))
}

/// Settle a payout (payment-rail completion callback).
async fn complete_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CompletePayoutRequest>,
) -> Result<Json<Settlement>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let settlement = state
        .engine
        .complete_payout(&PayoutId::from(id), req.transaction_id, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(settlement))
}

/// Operator force-sync; runs the same settlement path as `complete`
/// with a synthetic transaction reference.
async fn sync_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<Settlement>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let id = PayoutId::from(id);
    let settlement = state
        .engine
        .complete_payout(&id, format!("sync:{}", id), req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(settlement))
}

/// Cancel a payout, releasing its claimed earnings.
async fn cancel_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelPayoutRequest>,
) -> Result<Json<Payout>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let payout = state
        .engine
        .cancel_payout(&PayoutId::from(id), req.reason, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(payout))
}

/// Record a payment-rail failure, releasing claimed earnings.
async fn fail_payout_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<FailPayoutRequest>,
) -> Result<Json<Payout>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let payout = state
        .engine
        .fail_payout(&PayoutId::from(id), req.message, req.actor)
        .await
        .map_err(to_error_response)?;

    Ok(Json(payout))
}

/// A payout's timeline, oldest first.
async fn payout_timeline_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<TimelineResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let timeline = state
        .engine
        .payout_timeline(&PayoutId::from(id))
        .await
        .map_err(to_error_response)?;

    Ok(Json(TimelineResponse {
        count: timeline.len(),
        timeline,
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_amount(value: Decimal) -> Result<Amount, (StatusCode, Json<ErrorResponse>)> {
    Amount::new(value).map_err(|e| to_error_response(e.into()))
}

fn to_error_response(error: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::Domain(DomainError::InvalidTransition { .. }) => StatusCode::CONFLICT,
        EngineError::Consistency(_) => StatusCode::CONFLICT,
        EngineError::Validation { .. } | EngineError::Domain(DomainError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        EngineError::ResourceBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if let EngineError::Store(cause) = &error {
        tracing::error!(%cause, "store failure surfaced to the API");
    }

    let reason = match &error {
        EngineError::Validation { reason, .. } => Some(reason.code().to_string()),
        _ => None,
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            reason,
        }),
    )
}

// =============================================================================
// Tests
// =============================================================================
