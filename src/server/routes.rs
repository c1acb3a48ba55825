//! REST routes over a [`Storage`].

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::ApiError;
use crate::models::{
    DataEnvelope, Expense, ExpenseDetails, ExpenseId, HealthStatus, NewExpense, NewTopUp,
    NewTransfer, TopUp, Transaction, TransactionId, Transfer, User,
};
use crate::storage::Storage;
use crate::validation::{ExpenseInput, TopUpInput, TransferInput, ValidationError};

/// Shared handler state.
type Store<S> = State<Arc<S>>;

/// Handler result.
type ApiResult<T> = Result<T, ApiError>;

/// Builds the API router over `store`.
///
/// Requests are traced with `tower-http`'s [`TraceLayer`]. Browsers may call
/// the API from `allowed_origins`; origins that are not valid header values
/// are skipped with a warning.
#[inline]
pub fn router<S: Storage + 'static>(store: Arc<S>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/expenses", get(list_expenses::<S>).post(create_expense::<S>))
        .route("/api/expenses/reset", post(reset_expenses::<S>))
        .route(
            "/api/expenses/:id",
            get(get_expense::<S>).delete(delete_expense::<S>),
        )
        .route("/api/topups", get(list_topups::<S>).post(create_topup::<S>))
        .route("/api/users", get(list_users::<S>))
        .route("/api/users/reset", post(reset_users::<S>))
        .route("/api/transactions", get(list_transactions::<S>))
        .route("/api/transactions/reset", post(reset_transactions::<S>))
        .route(
            "/api/transactions/:id/details",
            get(get_expense_details::<S>),
        )
        .route("/api/transfers", post(create_transfer::<S>))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Allows any method and header from the configured origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Turns an unreadable JSON body into a validation error.
fn malformed_body(rejection: &JsonRejection) -> ApiError {
    ValidationError::Malformed(rejection.body_text()).into()
}

/// Turns an unparsable path parameter into a validation error.
fn malformed_path(rejection: &PathRejection) -> ApiError {
    ValidationError::Malformed(rejection.body_text()).into()
}

/// `GET /api/health`: reports that the server is up.
async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// `GET /api/expenses`.
async fn list_expenses<S: Storage>(State(store): Store<S>) -> ApiResult<Json<Vec<Expense>>> {
    Ok(Json(store.expenses().await?))
}

/// `GET /api/expenses/:id`: the first stored expense with that ID.
async fn get_expense<S: Storage>(
    State(store): Store<S>,
    id: Result<Path<ExpenseId>, PathRejection>,
) -> ApiResult<Json<Expense>> {
    let Path(id) = id.map_err(|rejection| malformed_path(&rejection))?;
    store
        .expense(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("expense {id} not found")))
}

/// `POST /api/expenses`: validates the body and stores it.
async fn create_expense<S: Storage>(
    State(store): Store<S>,
    body: Result<Json<ExpenseInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let Json(input) = body.map_err(|rejection| malformed_body(&rejection))?;
    let expense = NewExpense::try_from(input)?;
    let stored = store.create_expense(expense).await?;
    tracing::info!(id = %stored.id, "expense created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `DELETE /api/expenses/:id`: `true` if something was removed.
async fn delete_expense<S: Storage>(
    State(store): Store<S>,
    id: Result<Path<ExpenseId>, PathRejection>,
) -> ApiResult<Json<bool>> {
    let Path(id) = id.map_err(|rejection| malformed_path(&rejection))?;
    let deleted = store.delete_expense(id).await?;
    tracing::info!(%id, deleted, "expense delete requested");
    Ok(Json(deleted))
}

/// `POST /api/expenses/reset`.
async fn reset_expenses<S: Storage>(
    State(store): Store<S>,
) -> ApiResult<Json<DataEnvelope<Expense>>> {
    Ok(Json(DataEnvelope::new(store.reset_expenses().await?)))
}

/// `GET /api/topups`.
async fn list_topups<S: Storage>(State(store): Store<S>) -> ApiResult<Json<Vec<TopUp>>> {
    Ok(Json(store.topups().await?))
}

/// `POST /api/topups`: validates the body and stores it.
async fn create_topup<S: Storage>(
    State(store): Store<S>,
    body: Result<Json<TopUpInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TopUp>)> {
    let Json(input) = body.map_err(|rejection| malformed_body(&rejection))?;
    let topup = NewTopUp::try_from(input)?;
    let stored = store.create_topup(topup).await?;
    tracing::info!(id = %stored.id, "top-up created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/users`.
async fn list_users<S: Storage>(State(store): Store<S>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(store.users().await?))
}

/// `POST /api/users/reset`.
async fn reset_users<S: Storage>(State(store): Store<S>) -> ApiResult<Json<DataEnvelope<User>>> {
    Ok(Json(DataEnvelope::new(store.reset_users().await?)))
}

/// `GET /api/transactions`.
async fn list_transactions<S: Storage>(
    State(store): Store<S>,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(store.transactions().await?))
}

/// `POST /api/transactions/reset`.
async fn reset_transactions<S: Storage>(
    State(store): Store<S>,
) -> ApiResult<Json<DataEnvelope<Transaction>>> {
    Ok(Json(DataEnvelope::new(store.reset_transactions().await?)))
}

/// `POST /api/transfers`: records a transfer between two stored users.
async fn create_transfer<S: Storage>(
    State(store): Store<S>,
    body: Result<Json<TransferInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Transfer>)> {
    let Json(input) = body.map_err(|rejection| malformed_body(&rejection))?;
    let transfer = NewTransfer::try_from(input)?;
    let stored = store.create_transfer(transfer).await?;
    tracing::info!(id = %stored.id, "transfer recorded");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/transactions/:id/details`: an expense transaction with its
/// payer and participants resolved to full users.
async fn get_expense_details<S: Storage>(
    State(store): Store<S>,
    id: Result<Path<TransactionId>, PathRejection>,
) -> ApiResult<Json<ExpenseDetails>> {
    let Path(id) = id.map_err(|rejection| malformed_path(&rejection))?;
    let transactions = store.transactions().await?;
    let Some(transaction) = transactions.iter().find(|transaction| transaction.id() == id) else {
        return Err(ApiError::NotFound(format!("transaction {id} not found")));
    };
    let users = store.users().await?;
    ExpenseDetails::resolve(transaction, &users)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no expense details for transaction {id}")))
}
