//! Credit balance and journal handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use retouch_core::CreditEntry;
use retouch_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for entry listings.
const DEFAULT_LIMIT: usize = 50;

/// Maximum page size for entry listings.
const MAX_LIMIT: usize = 200;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current balance in whole credits.
    pub credits: i64,
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    /// Page size.
    pub limit: Option<usize>,
    /// Items to skip.
    pub offset: Option<usize>,
}

impl Pagination {
    pub(crate) fn clamp(&self) -> (usize, usize) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        (limit, self.offset.unwrap_or(0))
    }
}

/// One ledger entry as rendered to the API.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub id: String,
    /// Signed amount in credits.
    pub amount: i64,
    /// Entry kind.
    pub kind: retouch_core::EntryKind,
    /// Balance after this entry.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&CreditEntry> for EntryResponse {
    fn from(entry: &CreditEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            amount: entry.amount,
            kind: entry.kind,
            balance_after: entry.balance_after,
            description: entry.description.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Get the authenticated user's credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let credits = state.store.balance(&auth.user_id)?;
    Ok(Json(BalanceResponse { credits }))
}

/// List the authenticated user's ledger entries, newest first.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let (limit, offset) = pagination.clamp();
    let entries = state.store.list_entries(&auth.user_id, limit, offset)?;
    Ok(Json(entries.iter().map(EntryResponse::from).collect()))
}
