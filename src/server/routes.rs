//! HTTP routes of the request dispatcher
//!
//! Decodes JSON requests, hands them to the [`LoanService`] with a fresh
//! [`CallContext`], and encodes the result or the protocol error.
//!
//! | Method | Path                | Operation           |
//! |--------|---------------------|---------------------|
//! | GET    | `/health`           | liveness check      |
//! | POST   | `/clients/login`    | `LoginClient`       |
//! | POST   | `/clients/register` | `RegisterClient`    |
//! | POST   | `/loans/request`    | `RequestAmount`     |
//! | POST   | `/loans/status`     | `CheckClientStatus` |
//! | POST   | `/loans/pay`        | `PayLoan`           |

use crate::service::{
    CallContext, Client, ErrorBody, LoanInfo, LoanRequest, LoanService, OperationMsg,
    UserCredentials, UserRegisterCredentials,
};
use crate::types::LoanServiceError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared state of all handlers
///
/// Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    service: LoanService,
    request_timeout: Duration,
    /// Cancelled on server shutdown; every call gets a child of it
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: LoanService, request_timeout: Duration, shutdown: CancellationToken) -> Self {
        Self {
            service,
            request_timeout,
            shutdown,
        }
    }

    fn call_context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout, self.shutdown.child_token())
    }
}

/// Build the router with all routes and request tracing
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/clients/login", post(login_handler))
        .route("/clients/register", post(register_handler))
        .route("/loans/request", post(request_amount_handler))
        .route("/loans/status", post(check_status_handler))
        .route("/loans/pay", post(pay_loan_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A facade error on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(LoanServiceError);

impl From<LoanServiceError> for ApiError {
    fn from(error: LoanServiceError) -> Self {
        ApiError(error)
    }
}

/// HTTP status for each facade error
pub fn status_for(error: &LoanServiceError) -> StatusCode {
    match error {
        LoanServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LoanServiceError::AlreadyExists { .. } | LoanServiceError::AlreadyHasLoan { .. } => {
            StatusCode::CONFLICT
        }
        LoanServiceError::NotFound { .. } | LoanServiceError::NoActiveLoan { .. } => {
            StatusCode::NOT_FOUND
        }
        LoanServiceError::InvalidAmount { .. } | LoanServiceError::InvalidName => {
            StatusCode::BAD_REQUEST
        }
        LoanServiceError::Unavailable { .. } | LoanServiceError::Cancelled => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        LoanServiceError::IdOutOfRange { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        LoanServiceError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Storage details stay in the logs
        let message = match &self.0 {
            LoanServiceError::Unavailable { .. } => "service unavailable".to_string(),
            other => other.to_string(),
        };
        (status_for(&self.0), Json(ErrorBody { error: message })).into_response()
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn login_handler(
    State(state): State<AppState>,
    Json(credentials): Json<UserCredentials>,
) -> Result<Json<Client>, ApiError> {
    let ctx = state.call_context();
    Ok(Json(state.service.login_client(&ctx, credentials).await?))
}

async fn register_handler(
    State(state): State<AppState>,
    Json(credentials): Json<UserRegisterCredentials>,
) -> Result<Json<Client>, ApiError> {
    let ctx = state.call_context();
    Ok(Json(state.service.register_client(&ctx, credentials).await?))
}

async fn request_amount_handler(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> Result<Json<LoanInfo>, ApiError> {
    let ctx = state.call_context();
    Ok(Json(state.service.request_amount(&ctx, request).await?))
}

async fn check_status_handler(
    State(state): State<AppState>,
    Json(client): Json<Client>,
) -> Result<Json<LoanInfo>, ApiError> {
    let ctx = state.call_context();
    Ok(Json(state.service.check_client_status(&ctx, client).await?))
}

async fn pay_loan_handler(
    State(state): State<AppState>,
    Json(client): Json<Client>,
) -> Result<Json<OperationMsg>, ApiError> {
    let ctx = state.call_context();
    Ok(Json(state.service.pay_loan(&ctx, client).await?))
}
