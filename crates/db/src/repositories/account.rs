//! Account repository.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entities::{
    accounts,
    sea_orm_active_enums::{AccountStatus, AccountType},
};
use crate::error::{SaccoError, SaccoResult};

/// Account data access.
#[derive(Debug, Clone, Copy)]
pub struct AccountRepository;

impl AccountRepository {
    /// Finds an account by id.
    pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> SaccoResult<accounts::Model> {
        accounts::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("account", id))
    }

    /// Locks an account row for update.
    pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> SaccoResult<accounts::Model> {
        accounts::Entity::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| SaccoError::not_found("account", id))
    }

    /// Finds a member's account of the given type.
    pub async fn find_by_member_and_type<C: ConnectionTrait>(
        conn: &C,
        member_id: Uuid,
        account_type: AccountType,
    ) -> SaccoResult<Option<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::MemberId.eq(member_id))
            .filter(accounts::Column::AccountType.eq(account_type))
            .one(conn)
            .await?)
    }

    /// Lists a member's accounts ordered by id.
    pub async fn list_for_member<C: ConnectionTrait>(
        conn: &C,
        member_id: Uuid,
    ) -> SaccoResult<Vec<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::MemberId.eq(member_id))
            .order_by_asc(accounts::Column::Id)
            .all(conn)
            .await?)
    }

    /// Locks every account of a member, in ascending id order.
    pub async fn lock_for_member<C: ConnectionTrait>(
        conn: &C,
        member_id: Uuid,
    ) -> SaccoResult<Vec<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::MemberId.eq(member_id))
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .all(conn)
            .await?)
    }

    /// Lists active accounts earning interest.
    pub async fn list_interest_bearing<C: ConnectionTrait>(
        conn: &C,
    ) -> SaccoResult<Vec<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::Status.eq(AccountStatus::Active))
            .filter(accounts::Column::InterestRate.gt(rust_decimal::Decimal::ZERO))
            .order_by_asc(accounts::Column::Id)
            .all(conn)
            .await?)
    }
}
