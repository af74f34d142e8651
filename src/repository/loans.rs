//! Loans repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookStatus,
        loan::{CreateLoan, Loan, LoanRow, OpenLoan},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get every loan of a user with its book, most recent first
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanRow>> {
        let loans = sqlx::query_as::<_, LoanRow>(
            r#"
            SELECT l.id, l.book_id, l.loan_date, l.expected_return_date, l.actual_return_date,
                   b.title AS book_title, b.author AS book_author
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1
            ORDER BY l.loan_date DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Borrow a book: record the loan and flag the book as loaned.
    ///
    /// The book row stays locked until commit, so two concurrent borrows of
    /// the same book cannot both see it available.
    pub async fn create(&self, loan: &CreateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let status: Option<BookStatus> =
            sqlx::query_scalar("SELECT status FROM books WHERE id = $1 FOR UPDATE")
                .bind(loan.book_id)
                .fetch_optional(&mut *tx)
                .await?;

        match status {
            None => {
                return Err(AppError::NotFound(format!("Book with id {} not found", loan.book_id)))
            }
            Some(BookStatus::Loaned) => {
                return Err(AppError::Unavailable("Book is already loaned".to_string()))
            }
            Some(BookStatus::Available) => {}
        }

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, loan_date, expected_return_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, book_id, loan_date, expected_return_date, actual_return_date
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.loan_date)
        .bind(loan.expected_return_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(BookStatus::Loaned)
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Close an open loan and make its book available again.
    ///
    /// With `borrower` set, only that user's loan may be closed.
    pub async fn return_loan(
        &self,
        loan_id: i32,
        returned_on: NaiveDate,
        borrower: Option<i32>,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let open = sqlx::query_as::<_, OpenLoan>(
            r#"
            SELECT id, user_id, book_id FROM loans
            WHERE id = $1 AND actual_return_date IS NULL
            FOR UPDATE
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No open loan found with id {}", loan_id)))?;

        if let Some(user_id) = borrower {
            if open.user_id != user_id {
                return Err(AppError::Authorization(
                    "Only the borrower can return this book".to_string(),
                ));
            }
        }

        let returned = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET actual_return_date = $1
            WHERE id = $2
            RETURNING id, user_id, book_id, loan_date, expected_return_date, actual_return_date
            "#,
        )
        .bind(returned_on)
        .bind(open.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(BookStatus::Available)
            .bind(open.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(returned)
    }

    /// Count open loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE actual_return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count open loans past their expected return date
    pub async fn count_overdue(&self, today: NaiveDate) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE actual_return_date IS NULL AND expected_return_date < $1",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
