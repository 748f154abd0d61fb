//! `SeaORM` Entity for sacco_loan_products table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::InterestMethod;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sacco_loan_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub min_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub max_amount: Decimal,
    pub min_term_months: i32,
    pub max_term_months: i32,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub interest_rate: Decimal,
    pub interest_method: InterestMethod,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub processing_fee_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub insurance_fee_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loans::Entity")]
    Loans,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
