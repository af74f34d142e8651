//! Loan model, loan-period rules and late tracking

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
}

/// Loan joined with its book, as read from the database
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book_title: String,
    pub book_author: String,
}

/// Loan with book details and late status for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book_title: String,
    pub book_author: String,
    pub is_late: bool,
    pub days_late: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_message: Option<String>,
}

impl LoanDetails {
    /// Build display details, deriving the late flag relative to `today`
    pub fn from_row(row: LoanRow, today: NaiveDate) -> Self {
        let days_late = days_late(row.expected_return_date, row.actual_return_date, today);
        let late_message = (days_late > 0).then(|| late_message(days_late));

        Self {
            id: row.id,
            book_id: row.book_id,
            loan_date: row.loan_date,
            expected_return_date: row.expected_return_date,
            actual_return_date: row.actual_return_date,
            book_title: row.book_title,
            book_author: row.book_author,
            is_late: days_late > 0,
            days_late,
            late_message,
        }
    }
}

/// Validated borrow request
#[derive(Debug, Clone)]
pub struct CreateLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub expected_return_date: NaiveDate,
}

/// Loan still waiting for its book to come back
#[derive(Debug, Clone, FromRow)]
pub struct OpenLoan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
}

/// Parse an expected return date.
///
/// Accepts a calendar date (`2025-03-14`) or an RFC 3339 timestamp, which is
/// reduced to its UTC date.
pub fn parse_return_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| AppError::BadRequest("Invalid return date".to_string()))
}

/// Check that `expected` falls strictly after `loan_date` and at most
/// `max_days` days after it.
pub fn validate_loan_period(
    loan_date: NaiveDate,
    expected: NaiveDate,
    max_days: i64,
) -> AppResult<()> {
    if expected <= loan_date {
        return Err(AppError::BadRequest(
            "Return date must be after the loan date".to_string(),
        ));
    }

    if (expected - loan_date).num_days() > max_days {
        return Err(AppError::BadRequest(format!(
            "Loan duration cannot exceed {} days",
            max_days
        )));
    }

    Ok(())
}

/// Whole days past the expected return date; zero once returned or on time.
pub fn days_late(expected: NaiveDate, returned: Option<NaiveDate>, today: NaiveDate) -> i64 {
    if returned.is_some() || expected >= today {
        return 0;
    }
    (today - expected).num_days()
}

fn late_message(days: i64) -> String {
    if days == 1 {
        "This book is 1 day late.".to_string()
    } else {
        format!("This book is {} days late.", days)
    }
}
