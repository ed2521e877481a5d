use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::instrument;

use super::{
    dto::{Envelope, LoginRequest, SearchParams},
    filter::Filter,
    repo_types::UserInput,
};
use crate::{auth::jwt::AuthUser, error::AccountError, state::AppState};

type ApiResult = Result<Json<Envelope>, AccountError>;

// Rejections are converted so malformed input still gets the envelope body.
type Body<T> = Result<Json<T>, JsonRejection>;
type UserId = Result<Path<i64>, PathRejection>;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/profile", get(profile))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/search", post(search_users))
        .route(
            "/users/:id",
            get(show_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn signup(State(state): State<AppState>, payload: Body<UserInput>) -> ApiResult {
    let Json(payload) = payload?;
    let user = state.accounts.signup(payload).await?;
    Ok(Json(Envelope::success("New user created").with_user(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(State(state): State<AppState>, payload: Body<LoginRequest>) -> ApiResult {
    let Json(payload) = payload?;
    let token = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(Envelope::success("Login token generated").with_token(token)))
}

#[instrument(skip(state))]
pub async fn profile(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> ApiResult {
    let user = state.accounts.profile(user_id).await?;
    Ok(Json(Envelope::success("Retrieved user").with_user(user)))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult {
    let users = state.accounts.list().await?;
    Ok(Json(Envelope::success("Retrieved users").with_users(users)))
}

#[instrument(skip(state, q, params))]
pub async fn search_users(
    State(state): State<AppState>,
    q: Result<Query<SearchParams>, QueryRejection>,
    params: Body<Map<String, Value>>,
) -> ApiResult {
    let (Query(q), Json(params)) = (q?, params?);
    let filter = Filter::from_json(&params)?;
    let users = state.accounts.search(filter, q.op).await?;
    Ok(Json(Envelope::success("Retrieved users").with_users(users)))
}

#[instrument(skip(state, id))]
pub async fn show_user(State(state): State<AppState>, id: UserId) -> ApiResult {
    let Path(id) = id?;
    let user = state.accounts.show(id).await?;
    Ok(Json(Envelope::success("Retrieved user").with_user(user)))
}

#[instrument(skip(state, id, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: UserId,
    payload: Body<UserInput>,
) -> ApiResult {
    let (Path(id), Json(payload)) = (id?, payload?);
    let user = state.accounts.update(user_id, id, payload).await?;
    Ok(Json(Envelope::success("Updated user").with_user(user)))
}

#[instrument(skip(state, id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: UserId,
) -> ApiResult {
    let Path(id) = id?;
    state.accounts.delete(user_id, id).await?;
    Ok(Json(Envelope::success("Deleted user")))
}
