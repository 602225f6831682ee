use std::sync::Arc;

use axum::{
    extract::{Path, State as AppState},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use rand::Rng;
use tracing::info;

use loyalty::{
    card::Card,
    payloads::{
        CardView, GrantPoints, PassUrl, PresenceRecord, RedeemedDrinks, RedeemedPoints,
        RedeemPoints, Registered, WorkerLogin, WorkerToken,
    },
};

use crate::{error::AppError, state::State, worker};

pub const WORKER_TOKEN_HEADER: &str = "x-worker-token";

const CLIENT_ID_ATTEMPTS: usize = 50;

pub async fn register_handler(
    AppState(state): AppState<Arc<State>>,
) -> Result<impl IntoResponse, AppError> {
    let client_id = allocate_client_id(&state).await?;
    let card = Card::new();

    state.cards.save(&client_id, &card).await?;
    state
        .presence
        .push(&client_id, &PresenceRecord::from(&card))
        .await;
    info!("Registered client {client_id}");

    Ok(Json(Registered {
        pass_url: pass_url(&state.config.public_url, &client_id),
        client_id,
    }))
}

pub async fn catalog_handler(AppState(state): AppState<Arc<State>>) -> impl IntoResponse {
    Json(state.catalog.clone())
}

pub async fn card_handler(
    AppState(state): AppState<Arc<State>>,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let card = state
        .cards
        .load(&client_id)
        .await?
        .ok_or(AppError::ClientNotFound)?;

    Ok(Json(CardView::of(
        &card,
        &state.catalog,
        Utc::now().timestamp_millis(),
    )))
}

pub async fn redeem_handler(
    AppState(state): AppState<Arc<State>>,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut card = state
        .cards
        .load(&client_id)
        .await?
        .ok_or(AppError::ClientNotFound)?;

    let tier = card.redeem(&state.catalog, Utc::now())?;

    state.cards.save(&client_id, &card).await?;
    state
        .presence
        .push(&client_id, &PresenceRecord::from(&card))
        .await;
    info!("Client {client_id} redeemed {} drinks", tier.drinks);

    Ok(Json(RedeemedDrinks {
        drinks: tier.drinks,
        stamps_spent: tier.stamps,
    }))
}

pub async fn redeem_points_handler(
    AppState(state): AppState<Arc<State>>,
    Path(client_id): Path<String>,
    Json(payload): Json<RedeemPoints>,
) -> Result<impl IntoResponse, AppError> {
    let mut card = state
        .cards
        .load(&client_id)
        .await?
        .ok_or(AppError::ClientNotFound)?;

    let reward = card.redeem_points(&state.catalog, payload.index, Utc::now())?;

    state.cards.save(&client_id, &card).await?;
    state
        .presence
        .push(&client_id, &PresenceRecord::from(&card))
        .await;
    info!("Client {client_id} spent {} points on {}", reward.points, reward.label);

    Ok(Json(RedeemedPoints {
        reward: reward.label,
        points_spent: reward.points,
        points_left: card.points,
    }))
}

pub async fn pass_handler(
    AppState(state): AppState<Arc<State>>,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .cards
        .load(&client_id)
        .await?
        .ok_or(AppError::ClientNotFound)?;

    Ok(Json(PassUrl {
        url: pass_url(&state.config.public_url, &client_id),
    }))
}

pub async fn worker_login_handler(
    AppState(state): AppState<Arc<State>>,
    Json(payload): Json<WorkerLogin>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.workers.login(&payload.pin)?;
    info!("Worker logged in");

    Ok(Json(WorkerToken { token }))
}

pub async fn worker_logout_handler(
    AppState(state): AppState<Arc<State>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = worker_token(&headers) {
        state.workers.logout(token);
    }

    StatusCode::OK
}

pub async fn worker_lookup_handler(
    AppState(state): AppState<Arc<State>>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.workers.require(worker_token(&headers))?;

    let record = state
        .presence
        .lookup(&client_id)
        .ok_or(AppError::ClientNotFound)?;

    Ok(Json(record))
}

pub async fn worker_stamp_handler(
    AppState(state): AppState<Arc<State>>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.workers.require(worker_token(&headers))?;

    let card = worker::grant_stamp(&state, &client_id).await?;

    Ok(Json(PresenceRecord::from(&card)))
}

pub async fn worker_points_handler(
    AppState(state): AppState<Arc<State>>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
    Json(payload): Json<GrantPoints>,
) -> Result<impl IntoResponse, AppError> {
    state.workers.require(worker_token(&headers))?;

    let card = worker::grant_points(&state, &client_id, payload.amount).await?;

    Ok(Json(PresenceRecord::from(&card)))
}

fn worker_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(WORKER_TOKEN_HEADER)?.to_str().ok()
}

/// The link a customer device renders as its QR pass: the worker page with
/// the client id baked into the query string.
fn pass_url(public_url: &str, client_id: &str) -> String {
    format!(
        "{}/worker?client-id={client_id}",
        public_url.trim_end_matches('/')
    )
}

async fn allocate_client_id(state: &State) -> Result<String, AppError> {
    for _ in 0..CLIENT_ID_ATTEMPTS {
        let candidate = rand::thread_rng().gen_range(1000..10000).to_string();

        if state.cards.load(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    Err(AppError::Internal("client id space exhausted".into()))
}
