//! Member repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sacco_core::membership::format_member_number;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{member_sequences, members};
use crate::error::{SaccoError, SaccoResult};

/// Signed changes to a member's denormalized totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalsDelta {
    /// Change to `total_savings`.
    pub savings: Decimal,
    /// Change to `total_shares`.
    pub shares: Decimal,
    /// Change to `total_loans`.
    pub loans: Decimal,
}

impl TotalsDelta {
    /// Returns true if nothing changes.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.savings.is_zero() && self.shares.is_zero() && self.loans.is_zero()
    }
}

/// Member data access.
#[derive(Debug, Clone, Copy)]
pub struct MemberRepository;

impl MemberRepository {
    /// Finds a member by id.
    pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> SaccoResult<members::Model> {
        members::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("member", id))
    }

    /// Finds the membership of a platform user, if any.
    pub async fn find_by_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> SaccoResult<Option<members::Model>> {
        Ok(members::Entity::find()
            .filter(members::Column::UserId.eq(user_id))
            .one(conn)
            .await?)
    }

    /// Locks a member row for update.
    pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> SaccoResult<members::Model> {
        members::Entity::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("member", id))
    }

    /// Lists every member, oldest first.
    pub async fn list<C: ConnectionTrait>(conn: &C) -> SaccoResult<Vec<members::Model>> {
        Ok(members::Entity::find()
            .order_by_asc(members::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Applies `delta` to the member's totals and returns the updated row.
    ///
    /// The caller must hold the member lock.
    pub async fn apply_totals<C: ConnectionTrait>(
        conn: &C,
        member: &members::Model,
        delta: TotalsDelta,
        now: DateTime<Utc>,
    ) -> SaccoResult<members::Model> {
        if delta.is_zero() {
            return Ok(member.clone());
        }
        let mut active: members::ActiveModel = member.clone().into();
        active.total_savings = Set(member.total_savings + delta.savings);
        active.total_shares = Set(member.total_shares + delta.shares);
        active.total_loans = Set(member.total_loans + delta.loans);
        active.updated_at = Set(now.into());
        Ok(active.update(conn).await?)
    }

    /// Issues the next member number for `year`.
    ///
    /// The per-year counter row is created on first use and then locked, so
    /// concurrent registrations serialize on it and never reuse a number.
    pub async fn next_member_number<C: ConnectionTrait>(conn: &C, year: i32) -> SaccoResult<String> {
        member_sequences::Entity::insert(member_sequences::ActiveModel {
            year: Set(year),
            last_value: Set(0),
        })
        .on_conflict(
            OnConflict::column(member_sequences::Column::Year)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        let counter = member_sequences::Entity::find_by_id(year)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::Internal(format!("member sequence for {year} missing")))?;

        let next = counter.last_value + 1;
        let mut active: member_sequences::ActiveModel = counter.into();
        active.last_value = Set(next);
        active.update(conn).await?;

        Ok(format_member_number(year, next))
    }
}
