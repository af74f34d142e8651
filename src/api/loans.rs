//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails},
};

use super::{AppJson, AuthenticatedUser};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    #[serde(alias = "id_book")]
    pub book_id: Option<i32>,
    /// Expected return date (YYYY-MM-DD), at most 30 days ahead by default
    pub expected_return_date: Option<String>,
}

/// Loan state after a borrow or a return
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    /// Status message
    pub message: String,
}

impl LoanResponse {
    fn new(loan: Loan, message: &str) -> Self {
        Self {
            id: loan.id,
            book_id: loan.book_id,
            loan_date: loan.loan_date,
            expected_return_date: loan.expected_return_date,
            actual_return_date: loan.actual_return_date,
            message: message.to_string(),
        }
    }
}

/// List the caller's loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's loans, newest first", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.get_user_loans(claims.user_id).await?;
    Ok(Json(loans))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's loans, newest first", body = Vec<LoanDetails>),
        (status = 403, description = "Not the user and not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_self_or_admin(user_id)?;

    let loans = state.services.loans.get_loans_of_existing_user(user_id).await?;
    Ok(Json(loans))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Missing fields, invalid dates or book already loaned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Guests cannot borrow"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    claims.require_borrower()?;

    let (Some(book_id), Some(expected_return_date)) =
        (request.book_id, request.expected_return_date.as_deref())
    else {
        return Err(AppError::BadRequest(
            "Book id and expected return date are required".to_string(),
        ));
    };

    let loan = state
        .services
        .loans
        .borrow(claims.user_id, book_id, expected_return_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse::new(loan, "Book borrowed successfully")),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LoanResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "No open loan found with this id")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.return_loan(&claims, loan_id).await?;

    Ok(Json(LoanResponse::new(loan, "Book returned successfully")))
}

/// Return a borrowed book (PUT form of the same operation)
#[utoipa::path(
    put,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LoanResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "No open loan found with this id")
    )
)]
pub async fn put_return_loan(
    state: State<crate::AppState>,
    user: AuthenticatedUser,
    loan_id: Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    return_loan(state, user, loan_id).await
}
