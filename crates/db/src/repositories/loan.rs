//! Loan and loan product repository.

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entities::{loan_products, loans, sea_orm_active_enums::LoanStatus};
use crate::error::{SaccoError, SaccoResult};

/// Statuses in which money is owed.
pub const OUTSTANDING_STATUSES: [LoanStatus; 2] = [LoanStatus::Disbursed, LoanStatus::Active];

/// Loan data access.
#[derive(Debug, Clone, Copy)]
pub struct LoanRepository;

impl LoanRepository {
    /// Finds a loan by id.
    pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> SaccoResult<loans::Model> {
        loans::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("loan", id))
    }

    /// Locks a loan row for update.
    pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> SaccoResult<loans::Model> {
        loans::Entity::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("loan", id))
    }

    /// Lists a member's loans, newest application first.
    pub async fn list_for_member<C: ConnectionTrait>(
        conn: &C,
        member_id: Uuid,
    ) -> SaccoResult<Vec<loans::Model>> {
        Ok(loans::Entity::find()
            .filter(loans::Column::MemberId.eq(member_id))
            .order_by_desc(loans::Column::AppliedAt)
            .all(conn)
            .await?)
    }

    /// Lists a member's loans that still carry a balance.
    pub async fn outstanding_for_member<C: ConnectionTrait>(
        conn: &C,
        member_id: Uuid,
    ) -> SaccoResult<Vec<loans::Model>> {
        Ok(loans::Entity::find()
            .filter(loans::Column::MemberId.eq(member_id))
            .filter(loans::Column::Status.is_in(OUTSTANDING_STATUSES))
            .all(conn)
            .await?)
    }

    /// Counts a member's loans in `status`.
    pub async fn count_for_member<C: ConnectionTrait>(
        conn: &C,
        member_id: Uuid,
        status: LoanStatus,
    ) -> SaccoResult<u64> {
        Ok(loans::Entity::find()
            .filter(loans::Column::MemberId.eq(member_id))
            .filter(loans::Column::Status.eq(status))
            .count(conn)
            .await?)
    }

    /// Outstanding loans whose due date is on or before `cutoff`.
    pub async fn overdue<C: ConnectionTrait>(
        conn: &C,
        cutoff: NaiveDate,
    ) -> SaccoResult<Vec<loans::Model>> {
        Ok(loans::Entity::find()
            .filter(loans::Column::Status.is_in(OUTSTANDING_STATUSES))
            .filter(loans::Column::DueDate.lte(cutoff))
            .order_by_asc(loans::Column::DueDate)
            .all(conn)
            .await?)
    }

    /// Lists every loan.
    pub async fn list<C: ConnectionTrait>(conn: &C) -> SaccoResult<Vec<loans::Model>> {
        Ok(loans::Entity::find()
            .order_by_asc(loans::Column::AppliedAt)
            .all(conn)
            .await?)
    }

    /// Finds a loan product by id.
    pub async fn find_product<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> SaccoResult<loan_products::Model> {
        loan_products::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("loan product", id))
    }

    /// Lists every loan product by name.
    pub async fn list_products<C: ConnectionTrait>(
        conn: &C,
    ) -> SaccoResult<Vec<loan_products::Model>> {
        Ok(loan_products::Entity::find()
            .order_by_asc(loan_products::Column::Name)
            .all(conn)
            .await?)
    }
}
