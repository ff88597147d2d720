//! Order history handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::OrderRecord;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderRecord>,
}

/// The caller's orders, newest first.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<OrdersResponse>> {
    let orders = state.orders().list_for_user(&user_id).await?;
    Ok(Json(OrdersResponse { orders }))
}
