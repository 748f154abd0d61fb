//! `SeaORM` Entity for sacco_loans table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{InterestMethod, LoanStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sacco_loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub loan_number: String,
    pub member_id: Uuid,
    pub loan_product_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub principal_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub interest_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub processing_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub insurance_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount_paid: Decimal,
    pub term_months: i32,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub monthly_installment: Decimal,
    pub installments_remaining: i32,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub interest_rate: Decimal,
    pub interest_method: InterestMethod,
    pub purpose: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub guarantors: Json,
    pub status: LoanStatus,
    pub applied_at: DateTimeWithTimeZone,
    pub approved_date: Option<DateTimeWithTimeZone>,
    pub approved_by: Option<Uuid>,
    pub rejected_at: Option<DateTimeWithTimeZone>,
    pub rejected_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub disbursed_date: Option<Date>,
    pub disbursed_by: Option<Uuid>,
    pub due_date: Option<Date>,
    pub maturity_date: Option<Date>,
    pub last_payment_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub defaulted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id"
    )]
    Members,
    #[sea_orm(
        belongs_to = "super::loan_products::Entity",
        from = "Column::LoanProductId",
        to = "super::loan_products::Column::Id"
    )]
    LoanProducts,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::loan_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
