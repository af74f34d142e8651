//! Loan management service

use chrono::{NaiveDate, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{self, CreateLoan, Loan, LoanDetails},
        user::UserClaims,
    },
    repository::Repository,
};

/// Current calendar date (UTC), used as loan and return date
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Borrow a book for `user_id` until `expected_return_date`
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        expected_return_date: &str,
    ) -> AppResult<Loan> {
        match self.create_loan(user_id, book_id, expected_return_date).await {
            Ok(created) => {
                tracing::info!(
                    "Loan {} created: user={} book={} due={}",
                    created.id,
                    user_id,
                    book_id,
                    created.expected_return_date
                );
                Ok(created)
            }
            Err(e) => {
                tracing::warn!("Loan refused: user={} book={}: {}", user_id, book_id, e);
                Err(e)
            }
        }
    }

    async fn create_loan(
        &self,
        user_id: i32,
        book_id: i32,
        expected_return_date: &str,
    ) -> AppResult<Loan> {
        let loan_date = today();
        let expected = loan::parse_return_date(expected_return_date)?;
        loan::validate_loan_period(loan_date, expected, self.config.max_duration_days)?;

        let request = CreateLoan {
            user_id,
            book_id,
            loan_date,
            expected_return_date: expected,
        };
        self.repository.loans.create(&request).await
    }

    /// Return a borrowed book. Members may only return their own loans.
    pub async fn return_loan(&self, claims: &UserClaims, loan_id: i32) -> AppResult<Loan> {
        let borrower = if claims.is_admin() {
            None
        } else {
            Some(claims.user_id)
        };

        match self
            .repository
            .loans
            .return_loan(loan_id, today(), borrower)
            .await
        {
            Ok(returned) => {
                tracing::info!(
                    "Loan {} returned by user={} (book={})",
                    returned.id,
                    claims.user_id,
                    returned.book_id
                );
                Ok(returned)
            }
            Err(e) => {
                tracing::warn!("Return refused: user={} loan={}: {}", claims.user_id, loan_id, e);
                Err(e)
            }
        }
    }

    /// All loans of a user, newest first, with late flags as of today
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let today = today();
        let rows = self.repository.loans.get_user_loans(user_id).await?;
        Ok(rows
            .into_iter()
            .map(|row| LoanDetails::from_row(row, today))
            .collect())
    }

    /// Same as [`Self::get_user_loans`] but fails when the user does not exist
    pub async fn get_loans_of_existing_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        if !self.repository.users.exists(user_id).await? {
            return Err(AppError::NotFound(format!(
                "User with id {} not found",
                user_id
            )));
        }
        self.get_user_loans(user_id).await
    }

    /// Count open loans
    pub async fn count_active(&self) -> AppResult<i64> {
        self.repository.loans.count_active().await
    }

    /// Count open loans past their expected return date
    pub async fn count_overdue(&self) -> AppResult<i64> {
        self.repository.loans.count_overdue(today()).await
    }
}
