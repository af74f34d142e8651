//! Statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Book counters
#[derive(Serialize, ToSchema)]
pub struct BookStats {
    pub total: i64,
    pub available: i64,
    pub loaned: i64,
}

/// Loan counters
#[derive(Serialize, ToSchema)]
pub struct LoanStats {
    /// Loans not yet returned
    pub active: i64,
    /// Loans not yet returned and past their expected return date
    pub overdue: i64,
}

/// Statistics response
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub books: BookStats,
    pub loans: LoanStats,
}

/// Get catalog and loan statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    claims.require_admin()?;

    let books = state.services.catalog.counts().await?;
    let active = state.services.loans.count_active().await?;
    let overdue = state.services.loans.count_overdue().await?;

    Ok(Json(StatsResponse {
        books: BookStats {
            total: books.total,
            available: books.available,
            loaned: books.loaned,
        },
        loans: LoanStats { active, overdue },
    }))
}
