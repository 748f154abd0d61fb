//! Ledger entry repository.
//!
//! Entries are insert-only. There is deliberately no update or delete
//! function here.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entities::transactions;
use crate::error::SaccoResult;

/// Ledger entry data access.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRepository;

impl TransactionRepository {
    /// Inserts a new entry.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        entry: transactions::ActiveModel,
    ) -> SaccoResult<transactions::Model> {
        Ok(entry.insert(conn).await?)
    }

    /// Most recent entries for an account, newest first.
    pub async fn history<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
        limit: u64,
    ) -> SaccoResult<Vec<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .order_by_desc(transactions::Column::EntrySeq)
            .limit(limit)
            .all(conn)
            .await?)
    }

    /// Last entry strictly before `before`.
    pub async fn last_before<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
        before: DateTime<Utc>,
    ) -> SaccoResult<Option<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .filter(transactions::Column::CreatedAt.lt(DateTimeWithTimeZone::from(before)))
            .order_by_desc(transactions::Column::EntrySeq)
            .one(conn)
            .await?)
    }

    /// Entries with `start <= created_at < end`, in sequence order.
    pub async fn in_window<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SaccoResult<Vec<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .filter(transactions::Column::CreatedAt.gte(DateTimeWithTimeZone::from(start)))
            .filter(transactions::Column::CreatedAt.lt(DateTimeWithTimeZone::from(end)))
            .order_by_asc(transactions::Column::EntrySeq)
            .all(conn)
            .await?)
    }

    /// Every entry of an account, in sequence order.
    pub async fn chain<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
    ) -> SaccoResult<Vec<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .order_by_asc(transactions::Column::EntrySeq)
            .all(conn)
            .await?)
    }

    /// Both legs of a transfer.
    pub async fn by_reference<C: ConnectionTrait>(
        conn: &C,
        reference: &str,
    ) -> SaccoResult<Vec<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::TransactionReference.eq(reference))
            .order_by_asc(transactions::Column::CreatedAt)
            .all(conn)
            .await?)
    }

    /// Number of entries posted for a member.
    pub async fn count_for_member<C: ConnectionTrait>(conn: &C, member_id: Uuid) -> SaccoResult<u64> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::MemberId.eq(member_id))
            .count(conn)
            .await?)
    }
}
