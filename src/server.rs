//!
//! salesdesk HTTP server
//! ---------------------
//! This module defines the Axum-based REST API for the back-office.
//!
//! Responsibilities:
//! - Login/logout/check endpoints backed by the `identity` module.
//! - Bearer-token gating of every protected route; a denied request returns
//!   401 before any repository call.
//! - CRUD endpoints for customers and items.
//! - Transaction endpoints returning the enriched projection for both the
//!   list and create paths.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::error::AppError;
use crate::identity::{authorize, bearer_token, AuthProvider, LocalAuthProvider, LoginRequest, SessionManager};
use crate::model::{Customer, Item, Transaction};
use crate::storage::SharedStore;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub sessions: SessionManager,
}

/// Start the salesdesk HTTP server bound to the given port, with entity
/// tables stored under `db_root`.
pub async fn run_with_port(http_port: u16, db_root: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(db_root)
        .with_context(|| format!("Failed to create or access database root: {}", db_root))?;
    let store = SharedStore::new(db_root)
        .with_context(|| format!("While creating store with root: {}", db_root))?;
    {
        let guard = store.0.lock();
        crate::security::ensure_default_admin(&guard)
            .with_context(|| format!("While ensuring default admin under db_root: {}", db_root))?;
    }

    let state = AppState { store, sessions: SessionManager::new() };
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using the default port 7878 and db root "dbs".
pub async fn run() -> anyhow::Result<()> {
    run_with_port(7878, "dbs").await
}

/// Mount all routes onto a fresh Router. Split out from `run_with_port` so
/// tests can drive the app in-process.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "salesdesk ok" }))
        .route("/session/login", post(login))
        .route("/session/logout", get(logout))
        .route("/session/check", get(check))
        .route("/customer/all", get(customer_all))
        .route("/customer/create", post(customer_create))
        .route("/customer/edit", post(customer_edit))
        .route("/customer/delete", delete(customer_delete))
        .route("/item/all", get(item_all))
        .route("/item/create", post(item_create))
        .route("/item/edit", post(item_edit))
        .route("/item/delete", delete(item_delete))
        .route("/transaction/all", get(transaction_all))
        .route("/transaction/create", post(transaction_create))
        .with_state(state)
}

fn err_response(err: &AppError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status": "error", "code": err.code_str(), "message": err.message()}))).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct IdPayload {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CustomerPayload {
    code: String,
    name: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct CustomerEditPayload {
    id: i64,
    code: String,
    name: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct ItemPayload {
    code: String,
    name: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct ItemEditPayload {
    id: i64,
    code: String,
    name: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionPayload {
    item_id: i64,
    customer_id: i64,
    date: DateTime<Utc>,
    qty: i64,
    total_price: f64,
    discount: f64,
    price_after_discount: f64,
}

/// POST /session/login — on exactly one matching user, the response body is
/// the bearer token itself.
async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let provider = LocalAuthProvider::new(state.store.clone(), state.sessions.clone());
    let req = LoginRequest { username: payload.username, password: payload.password };
    match provider.login(&req) {
        Ok(resp) => (StatusCode::OK, resp.session.token).into_response(),
        Err(e) => {
            info!("login rejected for '{}': {e}", req.username);
            err_response(&AppError::auth("invalid_credentials", "invalid username or password"))
        }
    }
}

/// GET /session/logout — revoke the presented token unconditionally.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(&token);
    }
    StatusCode::OK.into_response()
}

/// GET /session/check — 200 when the token validates.
async fn check(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match authorize(&state.sessions, &headers) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => err_response(&e),
    }
}

async fn customer_all(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    match guard.find_all::<Customer>() {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            error!("customer list failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn customer_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CustomerPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    let row = Customer { id: 0, code: payload.code, name: payload.name, address: payload.address };
    match guard.create(row) {
        Ok(created) => Json(created).into_response(),
        Err(e) => {
            error!("customer create failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn customer_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CustomerEditPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    let found = match guard.find_by_id::<Customer>(payload.id) {
        Ok(v) => v,
        Err(e) => return err_response(&AppError::from(e)),
    };
    let Some(mut customer) = found else {
        return err_response(&AppError::not_found("no_such_customer", format!("no customer with id {}", payload.id)));
    };
    customer.code = payload.code;
    customer.name = payload.name;
    customer.address = payload.address;
    match guard.update(&customer) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("customer edit failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn customer_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    match guard.delete::<Customer>(payload.id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("customer delete failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn item_all(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    match guard.find_all::<Item>() {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            error!("item list failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn item_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    let row = Item { id: 0, code: payload.code, name: payload.name, price: payload.price };
    match guard.create(row) {
        Ok(created) => Json(created).into_response(),
        Err(e) => {
            error!("item create failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn item_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemEditPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    let found = match guard.find_by_id::<Item>(payload.id) {
        Ok(v) => v,
        Err(e) => return err_response(&AppError::from(e)),
    };
    let Some(mut item) = found else {
        return err_response(&AppError::not_found("no_such_item", format!("no item with id {}", payload.id)));
    };
    item.code = payload.code;
    item.name = payload.name;
    item.price = payload.price;
    match guard.update(&item) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("item edit failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

/// DELETE /item/delete — acts on the items table only.
async fn item_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    match guard.delete::<Item>(payload.id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("item delete failed: {e}");
            err_response(&AppError::from(e))
        }
    }
}

async fn transaction_all(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    let txs = match guard.find_all::<Transaction>() {
        Ok(rows) => rows,
        Err(e) => {
            error!("transaction list failed: {e}");
            return err_response(&AppError::from(e));
        }
    };
    match crate::enrich::enrich_all(&guard, &txs) {
        Ok(enriched) => Json(enriched).into_response(),
        Err(e) => {
            error!("transaction enrichment failed: {e}");
            err_response(&e)
        }
    }
}

async fn transaction_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TransactionPayload>,
) -> Response {
    if let Err(e) = authorize(&state.sessions, &headers) {
        return err_response(&e);
    }
    let guard = state.store.0.lock();
    // Referential checks before the write: an unknown item or customer id is
    // a payload defect, and nothing must be persisted for it.
    match guard.find_by_id::<Item>(payload.item_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return err_response(&AppError::user(
                "unknown_item",
                format!("no item with id {}", payload.item_id),
            ))
        }
        Err(e) => return err_response(&AppError::from(e)),
    }
    match guard.find_by_id::<Customer>(payload.customer_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return err_response(&AppError::user(
                "unknown_customer",
                format!("no customer with id {}", payload.customer_id),
            ))
        }
        Err(e) => return err_response(&AppError::from(e)),
    }

    let row = Transaction {
        id: 0,
        item_id: payload.item_id,
        customer_id: payload.customer_id,
        date: payload.date,
        qty: payload.qty,
        total_price: payload.total_price,
        discount: payload.discount,
        price_after_discount: payload.price_after_discount,
    };
    let created = match guard.create(row) {
        Ok(tx) => tx,
        Err(e) => {
            error!("transaction create failed: {e}");
            return err_response(&AppError::from(e));
        }
    };
    // Same enrichment contract as the list path, so both responses share one
    // shape.
    match crate::enrich::enrich(&guard, &created) {
        Ok(enriched) => Json(enriched).into_response(),
        Err(e) => {
            error!("transaction enrichment failed: {e}");
            err_response(&e)
        }
    }
}
