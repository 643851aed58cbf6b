//! REST API Server Module
//!
//! Exposes the order book over HTTP: a read-only query surface (orders,
//! next id, events, balances), the three mutating operations, and the
//! funding/approval plumbing an integration harness uses to provision
//! accounts before a scenario.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::hyper::body::Bytes;
use warp::{
    http::{Method, StatusCode},
    Filter, Rejection, Reply,
};

use crate::config::Config;
use crate::engine::EscrowEngine;
use crate::error::OrderBookError;
use crate::ledger::OrderId;
use crate::transfer::TokenBank;

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Request body for `POST /order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub maker: String,
    pub offered_token: String,
    pub offered_amount: u64,
    pub requested_token: String,
    pub requested_amount: u64,
}

/// Response body for `POST /order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    /// Ledger-assigned id of the new order
    pub order_id: OrderId,
}

/// Request body for `POST /order/:id/fill`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillOrderRequest {
    pub filler: String,
}

/// Request body for `POST /order/:id/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub caller: String,
}

/// Request body for `POST /fund`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRequest {
    pub token: String,
    pub account: String,
    pub amount: u64,
}

/// Request body for `POST /approve`. Grants the engine's custody account an
/// allowance from `owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub token: String,
    pub owner: String,
    pub amount: u64,
}

/// Query parameters for `GET /balance`.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceQuery {
    pub token: String,
    pub account: String,
}

/// Response body for `GET /balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub token: String,
    pub account: String,
    pub amount: u64,
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// Maps a domain error to an HTTP status code.
fn status_for(err: &OrderBookError) -> StatusCode {
    match err {
        OrderBookError::InvalidAmount => StatusCode::BAD_REQUEST,
        OrderBookError::TransferFailed(_) => StatusCode::CONFLICT,
        OrderBookError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderBookError::AlreadyClosed(_) => StatusCode::CONFLICT,
        OrderBookError::NotAuthorized => StatusCode::FORBIDDEN,
        OrderBookError::DuplicateId(_) => StatusCode::CONFLICT,
    }
}

/// Builds the standard failure reply for a domain error.
fn error_reply(err: OrderBookError) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(err.to_string()),
        }),
        status_for(&err),
    )
}

/// Builds the standard success reply.
fn ok_reply<T: Serialize>(data: T) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
        StatusCode::OK,
    )
}

// ============================================================================
// CUSTOM REJECTION TYPES
// ============================================================================

/// Custom rejection for JSON deserialization errors
#[derive(Debug)]
pub struct JsonDeserializeError(pub String);

impl warp::reject::Reject for JsonDeserializeError {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.contains(&"*".to_string()) {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// Converts warp rejections into standardized API responses with
/// appropriate HTTP status codes.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<JsonDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.0.clone())
    } else if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", err))
    } else if let Some(err) = rej.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, format!("Invalid query: {}", err))
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
        status,
    ))
}

// ============================================================================
// INJECTION FILTERS
// ============================================================================

/// Creates a warp filter that injects the engine into request handlers.
pub fn with_engine(
    engine: EscrowEngine,
) -> impl Filter<Extract = (EscrowEngine,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

/// Creates a warp filter that injects the token bank into request handlers.
pub fn with_bank(
    bank: Arc<TokenBank>,
) -> impl Filter<Extract = (Arc<TokenBank>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || bank.clone())
}

// ============================================================================
// REQUEST HANDLERS
// ============================================================================

/// Handler for `GET /order/:id`.
pub async fn get_order_handler(
    order_id: OrderId,
    engine: EscrowEngine,
) -> Result<impl warp::Reply, warp::Rejection> {
    match engine.get_order(order_id).await {
        Ok(order) => Ok(ok_reply(order)),
        Err(err) => Ok(error_reply(err)),
    }
}

/// Handler for `GET /nextorderid`.
pub async fn next_order_id_handler(
    engine: EscrowEngine,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(ok_reply(engine.next_order_id().await))
}

/// Handler for `GET /events`.
pub async fn get_events_handler(
    engine: EscrowEngine,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(ok_reply(engine.cached_events().await))
}

/// Handler for `GET /balance`.
pub async fn get_balance_handler(
    query: BalanceQuery,
    bank: Arc<TokenBank>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let amount = bank.balance(&query.token, &query.account);
    Ok(ok_reply(BalanceResponse {
        token: query.token,
        account: query.account,
        amount,
    }))
}

/// Handler for `POST /order`.
pub async fn create_order_handler(
    request: CreateOrderRequest,
    engine: EscrowEngine,
) -> Result<impl warp::Reply, warp::Rejection> {
    match engine
        .create_order(
            &request.maker,
            &request.offered_token,
            request.offered_amount,
            &request.requested_token,
            request.requested_amount,
        )
        .await
    {
        Ok(order_id) => Ok(ok_reply(CreateOrderResponse { order_id })),
        Err(err) => Ok(error_reply(err)),
    }
}

/// Handler for `POST /order/:id/fill`.
pub async fn fill_order_handler(
    order_id: OrderId,
    request: FillOrderRequest,
    engine: EscrowEngine,
) -> Result<impl warp::Reply, warp::Rejection> {
    match engine.fill_order(&request.filler, order_id).await {
        Ok(()) => Ok(ok_reply(order_id)),
        Err(err) => Ok(error_reply(err)),
    }
}

/// Handler for `POST /order/:id/cancel`.
pub async fn cancel_order_handler(
    order_id: OrderId,
    request: CancelOrderRequest,
    engine: EscrowEngine,
) -> Result<impl warp::Reply, warp::Rejection> {
    match engine.cancel_order(&request.caller, order_id).await {
        Ok(()) => Ok(ok_reply(order_id)),
        Err(err) => Ok(error_reply(err)),
    }
}

/// Handler for `POST /fund`.
pub async fn fund_handler(
    request: FundRequest,
    bank: Arc<TokenBank>,
) -> Result<impl warp::Reply, warp::Rejection> {
    bank.set_balance(&request.token, &request.account, request.amount);
    info!(
        token = %request.token,
        account = %request.account,
        amount = request.amount,
        "account funded"
    );
    Ok(ok_reply(BalanceResponse {
        token: request.token.clone(),
        account: request.account.clone(),
        amount: request.amount,
    }))
}

/// Handler for `POST /approve`.
pub async fn approve_handler(
    request: ApproveRequest,
    engine: EscrowEngine,
    bank: Arc<TokenBank>,
) -> Result<impl warp::Reply, warp::Rejection> {
    bank.approve(&request.token, &request.owner, request.amount);
    debug!(
        token = %request.token,
        owner = %request.owner,
        amount = request.amount,
        spender = engine.custody_account(),
        "allowance approved"
    );
    Ok(ok_reply(request.amount))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the order book service.
pub struct ApiServer {
    /// Service configuration
    config: Arc<Config>,
    /// Escrow engine (shared state behind the engine's own locks)
    engine: EscrowEngine,
    /// Token bank, for balance queries and harness funding/approval
    bank: Arc<TokenBank>,
}

impl ApiServer {
    /// Creates a new API server with the given components.
    pub fn new(config: Config, engine: EscrowEngine, bank: Arc<TokenBank>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            bank,
        }
    }

    /// Starts the API server and begins handling HTTP requests.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server ran to completion
    /// * `Err(anyhow::Error)` - Failed to start server
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.config.api.host, self.config.api.port
        );

        let routes = self.create_routes();

        let addr: std::net::SocketAddr =
            format!("{}:{}", self.config.api.host, self.config.api.port)
                .parse()
                .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        let engine = self.engine.clone();
        let bank = self.bank.clone();

        // Health check endpoint - returns service status
        let health = warp::path("health").and(warp::get()).map(|| {
            warp::reply::json(&ApiResponse::<String> {
                success: true,
                data: Some("Order book service is running".to_string()),
                error: None,
            })
        });

        // GET /order/:id - read-only order projection
        let get_order = warp::path("order")
            .and(warp::path::param())
            .and(warp::path::end())
            .and(warp::get())
            .and(with_engine(engine.clone()))
            .and_then(get_order_handler);

        // GET /nextorderid - deployment-verification read
        let next_order_id = warp::path("nextorderid")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_engine(engine.clone()))
            .and_then(next_order_id_handler);

        // GET /events - cached creation/fill/cancel events
        let events = warp::path("events")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_engine(engine.clone()))
            .and_then(get_events_handler);

        // GET /balance?token=..&account=.. - bank balance read
        let balance = warp::path("balance")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<BalanceQuery>())
            .and(with_bank(bank.clone()))
            .and_then(get_balance_handler);

        // POST /order - create a new order
        let create_engine = engine.clone();
        let create_order = warp::path("order")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::bytes())
            .and_then(move |body: Bytes| {
                let engine = create_engine.clone();
                async move {
                    let body_str = String::from_utf8_lossy(&body);
                    debug!("POST /order - Received body: {}", body_str);

                    match serde_json::from_slice::<CreateOrderRequest>(&body) {
                        Ok(request) => create_order_handler(request, engine).await,
                        Err(e) => {
                            error!("Order creation deserialization failed: {}. Body: {}", e, body_str);
                            Err(warp::reject::custom(JsonDeserializeError(format!(
                                "Invalid JSON: {}",
                                e
                            ))))
                        }
                    }
                }
            });

        // POST /order/:id/fill - fill an open order
        let fill_order = warp::path("order")
            .and(warp::path::param())
            .and(warp::path("fill"))
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_engine(engine.clone()))
            .and_then(fill_order_handler);

        // POST /order/:id/cancel - cancel an open order (maker only)
        let cancel_order = warp::path("order")
            .and(warp::path::param())
            .and(warp::path("cancel"))
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_engine(engine.clone()))
            .and_then(cancel_order_handler);

        // POST /fund - set an account balance (harness plumbing)
        let fund = warp::path("fund")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bank(bank.clone()))
            .and_then(fund_handler);

        // POST /approve - grant the custody account an allowance
        let approve = warp::path("approve")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_engine(engine))
            .and(with_bank(bank))
            .and_then(approve_handler);

        health
            .or(get_order)
            .or(next_order_id)
            .or(events)
            .or(balance)
            .or(create_order)
            .or(fill_order)
            .or(cancel_order)
            .or(fund)
            .or(approve)
            .with(create_cors_filter(&self.config.api.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    #[allow(dead_code)] // Used by tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
