//! Loan service: products, applications, approval, disbursement, repayment
//! and default detection.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sacco_core::account::EntryDirection;
use sacco_core::loan::{
    BorrowerSnapshot, EligibilityPolicy, LoanEligibility, ProductTerms, RepaymentState,
    ScheduleInput, ScheduledInstallment, add_months, apply_repayment, assess_eligibility,
    build_schedule, default_cutoff, is_in_default, next_due_date,
};
use sacco_core::{Actor, AuditAction, AuditEvent, AuditSubject};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseTransaction, Set};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::ledger::{EntryRequest, create_account, default_rate, post_entry, require_positive};
use super::{EntryMetadata, ServiceContext};
use crate::entities::{
    loan_products, loans, members,
    sea_orm_active_enums::{
        AccountStatus, AccountType, InterestMethod, LoanStatus, MemberStatus, TransactionType,
    },
    transactions,
};
use crate::error::{SaccoError, SaccoResult};
use crate::repositories::{
    AccountRepository, AuditLogRepository, LoanRepository, MemberRepository, member::TotalsDelta,
};

/// Input for creating a loan product.
#[derive(Debug, Clone)]
pub struct NewLoanProduct {
    /// Product name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Smallest principal offered.
    pub min_amount: Decimal,
    /// Largest principal offered.
    pub max_amount: Decimal,
    /// Shortest term in months.
    pub min_term_months: i32,
    /// Longest term in months.
    pub max_term_months: i32,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    /// How interest is computed.
    pub interest_method: InterestMethod,
    /// Processing fee, percent of principal.
    pub processing_fee_rate: Decimal,
    /// Insurance fee, percent of principal.
    pub insurance_fee_rate: Decimal,
}

/// A member's loan request.
#[derive(Debug, Clone)]
pub struct LoanApplication {
    /// Product applied for.
    pub loan_product_id: Uuid,
    /// Requested principal.
    pub amount: Decimal,
    /// Requested term in months.
    pub term_months: i32,
    /// Free-text purpose.
    pub purpose: Option<String>,
    /// Guarantor member ids.
    pub guarantors: Vec<Uuid>,
}

/// Result of paying out a loan.
#[derive(Debug, Clone, Serialize)]
pub struct Disbursement {
    /// Loan after disbursement.
    pub loan: loans::Model,
    /// Principal credit on the checking account.
    pub deposit: transactions::Model,
    /// Combined processing and insurance fee debit, if any.
    pub fee: Option<transactions::Model>,
}

/// Result of a repayment.
#[derive(Debug, Clone, Serialize)]
pub struct Repayment {
    /// Loan after the repayment.
    pub loan: loans::Model,
    /// Debit on the checking account.
    pub transaction: transactions::Model,
}

/// Portfolio-wide loan figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoanSummary {
    /// Every loan ever applied for.
    pub total_loans: usize,
    /// Waiting for a decision.
    pub pending_approval: usize,
    /// Approved, not yet disbursed.
    pub approved: usize,
    /// Disbursed or active.
    pub active: usize,
    /// Fully repaid.
    pub completed: usize,
    /// Written off.
    pub defaulted: usize,
    /// Refused.
    pub rejected: usize,
    /// Principal paid out.
    pub total_disbursed: Decimal,
    /// Balance still owed on disbursed and active loans.
    pub total_outstanding: Decimal,
    /// Repayments received.
    pub total_repaid: Decimal,
    /// Balance written off on defaulted loans.
    pub total_defaulted: Decimal,
}

/// A loan product with its usage figures.
#[derive(Debug, Clone, Serialize)]
pub struct LoanProductStats {
    /// The product.
    pub product: loan_products::Model,
    /// Loans applied for under this product.
    pub total_loans: usize,
    /// Disbursed or active loans.
    pub active_loans: usize,
    /// Principal paid out.
    pub total_disbursed: Decimal,
    /// Balance still owed.
    pub total_outstanding: Decimal,
}

/// Loan lifecycle operations.
#[derive(Debug, Clone)]
pub struct LoanService {
    ctx: ServiceContext,
}

impl LoanService {
    /// Creates a new loan service.
    #[must_use]
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Creates a loan product after validating its bounds.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_loan_product(
        &self,
        input: NewLoanProduct,
        actor: Actor,
    ) -> SaccoResult<loan_products::Model> {
        let terms = ProductTerms {
            min_amount: input.min_amount,
            max_amount: input.max_amount,
            min_term_months: input.min_term_months,
            max_term_months: input.max_term_months,
            interest_rate: input.interest_rate,
            interest_method: input.interest_method.into(),
            processing_fee_rate: input.processing_fee_rate,
            insurance_fee_rate: input.insurance_fee_rate,
        };
        terms.validate()?;

        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;
        let product = loan_products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            min_amount: Set(input.min_amount),
            max_amount: Set(input.max_amount),
            min_term_months: Set(input.min_term_months),
            max_term_months: Set(input.max_term_months),
            interest_rate: Set(input.interest_rate),
            interest_method: Set(input.interest_method),
            processing_fee_rate: Set(input.processing_fee_rate),
            insurance_fee_rate: Set(input.insurance_fee_rate),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(
                AuditAction::LoanProductCreated,
                AuditSubject::LoanProduct,
                product.id,
            )
            .with_new(serde_json::to_value(&product)?),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(product_id = %product.id, "Loan product created");
        Ok(product)
    }

    /// Evaluates every eligibility rule for a loan of `amount`.
    pub async fn check_loan_eligibility(
        &self,
        member_id: Uuid,
        amount: Decimal,
    ) -> SaccoResult<LoanEligibility> {
        let db = self.ctx.db();
        let member = MemberRepository::find(db, member_id).await?;
        let snapshot = borrower_snapshot(db, &member).await?;
        Ok(assess_eligibility(&snapshot, amount, &self.policy()))
    }

    /// Records a loan application priced from the product's terms.
    #[instrument(skip(self, application), fields(product_id = %application.loan_product_id, amount = %application.amount))]
    pub async fn apply_for_loan(
        &self,
        member_id: Uuid,
        application: LoanApplication,
        actor: Actor,
    ) -> SaccoResult<loans::Model> {
        require_positive(application.amount)?;
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let member = MemberRepository::lock(&txn, member_id).await?;
        let snapshot = borrower_snapshot(&txn, &member).await?;
        let eligibility = assess_eligibility(&snapshot, application.amount, &self.policy());
        if !eligibility.eligible {
            return Err(SaccoError::EligibilityFailed {
                reasons: eligibility.reasons,
            });
        }

        let product = LoanRepository::find_product(&txn, application.loan_product_id).await?;
        if !product.is_active {
            return Err(SaccoError::InvalidState(format!(
                "Loan product {} is not active",
                product.name
            )));
        }
        let terms = product_terms(&product);
        terms.check_request(application.amount, application.term_months)?;
        let quote = terms.quote(application.amount, application.term_months)?;

        let loan = loans::ActiveModel {
            id: Set(Uuid::new_v4()),
            loan_number: Set(self.ctx.references().loan_number()),
            member_id: Set(member.id),
            loan_product_id: Set(product.id),
            principal_amount: Set(quote.principal),
            interest_amount: Set(quote.interest_amount),
            total_amount: Set(quote.total_amount),
            processing_fee: Set(quote.processing_fee),
            insurance_fee: Set(quote.insurance_fee),
            balance: Set(quote.total_amount),
            amount_paid: Set(Decimal::ZERO),
            term_months: Set(quote.term_months),
            monthly_installment: Set(quote.monthly_installment),
            installments_remaining: Set(quote.term_months),
            interest_rate: Set(product.interest_rate),
            interest_method: Set(product.interest_method),
            purpose: Set(application.purpose),
            guarantors: Set(json!(application.guarantors)),
            status: Set(LoanStatus::PendingApproval),
            applied_at: Set(now.into()),
            approved_date: Set(None),
            approved_by: Set(None),
            rejected_at: Set(None),
            rejected_by: Set(None),
            rejection_reason: Set(None),
            disbursed_date: Set(None),
            disbursed_by: Set(None),
            due_date: Set(None),
            maturity_date: Set(None),
            last_payment_at: Set(None),
            completed_at: Set(None),
            defaulted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::LoanApplied, AuditSubject::Loan, loan.id).with_new(json!({
                "loan_number": loan.loan_number,
                "member_id": member.id,
                "loan_product_id": product.id,
                "principal_amount": loan.principal_amount,
                "total_amount": loan.total_amount,
                "term_months": loan.term_months,
                "status": loan.status.as_str(),
            })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(loan_id = %loan.id, loan_number = %loan.loan_number, total = %loan.total_amount, "Loan application recorded");
        Ok(loan)
    }

    /// Approves a pending application.
    #[instrument(skip(self))]
    pub async fn approve_loan(&self, loan_id: Uuid, actor: Actor) -> SaccoResult<loans::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let loan = LoanRepository::lock(&txn, loan_id).await?;
        require_transition(&loan, LoanStatus::Approved)?;

        let mut active: loans::ActiveModel = loan.clone().into();
        active.status = Set(LoanStatus::Approved);
        active.approved_date = Set(Some(now.into()));
        active.approved_by = Set(actor.id());
        active.updated_at = Set(now.into());
        let approved = active.update(&txn).await?;

        record_transition(&txn, AuditAction::LoanApproved, &loan, &approved, None, actor, now)
            .await?;
        txn.commit().await?;

        info!(loan_id = %loan_id, "Loan approved");
        Ok(approved)
    }

    /// Rejects a pending application.
    #[instrument(skip(self, reason))]
    pub async fn reject_loan(
        &self,
        loan_id: Uuid,
        actor: Actor,
        reason: &str,
    ) -> SaccoResult<loans::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let loan = LoanRepository::lock(&txn, loan_id).await?;
        require_transition(&loan, LoanStatus::Rejected)?;

        let mut active: loans::ActiveModel = loan.clone().into();
        active.status = Set(LoanStatus::Rejected);
        active.rejected_at = Set(Some(now.into()));
        active.rejected_by = Set(actor.id());
        active.rejection_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(now.into());
        let rejected = active.update(&txn).await?;

        record_transition(
            &txn,
            AuditAction::LoanRejected,
            &loan,
            &rejected,
            Some(reason),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(loan_id = %loan_id, "Loan rejected");
        Ok(rejected)
    }

    /// Pays an approved loan into the member's checking account and deducts
    /// the fees.
    #[instrument(skip(self))]
    pub async fn disburse_loan(&self, loan_id: Uuid, actor: Actor) -> SaccoResult<Disbursement> {
        let now = self.ctx.now();
        let today = now.date_naive();
        let txn = self.ctx.begin().await?;

        let unlocked = LoanRepository::find(&txn, loan_id).await?;
        let member = MemberRepository::lock(&txn, unlocked.member_id).await?;
        if member.status != MemberStatus::Active {
            return Err(SaccoError::InvalidState(format!(
                "Member {} is {}",
                member.member_number,
                member.status.as_str()
            )));
        }
        let checking = match AccountRepository::find_by_member_and_type(
            &txn,
            member.id,
            AccountType::Checking,
        )
        .await?
        {
            Some(account) => AccountRepository::lock(&txn, account.id).await?,
            None => {
                let rate = default_rate(&self.ctx.config().accounts, AccountType::Checking);
                create_account(
                    &txn,
                    &member,
                    AccountType::Checking,
                    AccountStatus::Active,
                    rate,
                    actor,
                    now,
                )
                .await?
            }
        };
        let loan = LoanRepository::lock(&txn, loan_id).await?;
        require_transition(&loan, LoanStatus::Disbursed)?;

        let loan_meta = json!({ "loan_id": loan.id, "loan_number": loan.loan_number });
        let deposit = post_entry(
            &txn,
            &member,
            &checking,
            EntryRequest {
                transaction_type: TransactionType::Deposit,
                direction: EntryDirection::Credit,
                amount: loan.principal_amount,
                reference: None,
                details: EntryMetadata {
                    description: Some(format!("Loan {} disbursement", loan.loan_number)),
                    metadata: Some(loan_meta.clone()),
                },
                processed_by: actor.id(),
                check_available: false,
            },
            now,
        )
        .await?;

        let fees = loan.processing_fee + loan.insurance_fee;
        let (member, fee) = if fees > Decimal::ZERO {
            let posted = post_entry(
                &txn,
                &deposit.member,
                &deposit.account,
                EntryRequest {
                    transaction_type: TransactionType::Fee,
                    direction: EntryDirection::Debit,
                    amount: fees,
                    reference: None,
                    details: EntryMetadata {
                        description: Some(format!(
                            "Loan {} processing and insurance fees",
                            loan.loan_number
                        )),
                        metadata: Some(loan_meta),
                    },
                    processed_by: actor.id(),
                    check_available: false,
                },
                now,
            )
            .await?;
            (posted.member, Some(posted.entry))
        } else {
            (deposit.member, None)
        };

        MemberRepository::apply_totals(
            &txn,
            &member,
            TotalsDelta {
                loans: loan.total_amount,
                ..TotalsDelta::default()
            },
            now,
        )
        .await?;

        let first_due = add_months(today, 1)?;
        let maturity = add_months(today, months(loan.term_months)?)?;
        let mut active: loans::ActiveModel = loan.clone().into();
        active.status = Set(LoanStatus::Disbursed);
        active.disbursed_date = Set(Some(today));
        active.disbursed_by = Set(actor.id());
        active.due_date = Set(Some(first_due));
        active.maturity_date = Set(Some(maturity));
        active.updated_at = Set(now.into());
        let disbursed = active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::LoanDisbursed, AuditSubject::Loan, loan.id)
                .with_old(json!({ "status": loan.status.as_str() }))
                .with_new(json!({
                    "status": disbursed.status.as_str(),
                    "account_id": checking.id,
                    "principal_amount": loan.principal_amount,
                    "fees": fees,
                    "deposit_transaction_id": deposit.entry.id,
                    "fee_transaction_id": fee.as_ref().map(|entry| entry.id),
                    "due_date": first_due,
                    "maturity_date": maturity,
                })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(loan_id = %loan_id, account_id = %checking.id, principal = %loan.principal_amount, fees = %fees, "Loan disbursed");
        Ok(Disbursement {
            loan: disbursed,
            deposit: deposit.entry,
            fee,
        })
    }

    /// Debits a repayment from the member's checking account.
    ///
    /// Amounts above the outstanding balance are capped to it.
    #[instrument(skip(self, details))]
    pub async fn record_repayment(
        &self,
        loan_id: Uuid,
        amount: Decimal,
        details: EntryMetadata,
        actor: Actor,
    ) -> SaccoResult<Repayment> {
        require_positive(amount)?;
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let unlocked = LoanRepository::find(&txn, loan_id).await?;
        let member = MemberRepository::lock(&txn, unlocked.member_id).await?;
        let checking =
            AccountRepository::find_by_member_and_type(&txn, member.id, AccountType::Checking)
                .await?
                .ok_or_else(|| {
                    SaccoError::InvalidState(format!(
                        "Member {} has no checking account",
                        member.member_number
                    ))
                })?;
        let checking = AccountRepository::lock(&txn, checking.id).await?;
        let loan = LoanRepository::lock(&txn, loan_id).await?;
        if !loan.status.is_active() {
            return Err(SaccoError::InvalidState(format!(
                "Loan {} is {}, repayments require disbursed or active",
                loan.loan_number,
                loan.status.as_str()
            )));
        }

        let outcome = apply_repayment(
            RepaymentState {
                balance: loan.balance,
                amount_paid: loan.amount_paid,
                monthly_installment: loan.monthly_installment,
            },
            amount,
        )?;

        let posted = post_entry(
            &txn,
            &member,
            &checking,
            EntryRequest {
                transaction_type: TransactionType::LoanRepayment,
                direction: EntryDirection::Debit,
                amount: outcome.applied,
                reference: None,
                details: EntryMetadata {
                    description: details
                        .description
                        .or_else(|| Some(format!("Repayment of loan {}", loan.loan_number))),
                    metadata: details.metadata.or_else(|| {
                        Some(json!({ "loan_id": loan.id, "loan_number": loan.loan_number }))
                    }),
                },
                processed_by: actor.id(),
                check_available: true,
            },
            now,
        )
        .await?;

        MemberRepository::apply_totals(
            &txn,
            &posted.member,
            TotalsDelta {
                loans: -outcome.applied,
                ..TotalsDelta::default()
            },
            now,
        )
        .await?;

        let disbursed_on = loan.disbursed_date.ok_or_else(|| {
            SaccoError::Internal(format!("Loan {} has no disbursement date", loan.id))
        })?;
        let mut active: loans::ActiveModel = loan.clone().into();
        active.balance = Set(outcome.balance);
        active.amount_paid = Set(outcome.amount_paid);
        active.installments_remaining = Set(outcome.installments_remaining);
        active.last_payment_at = Set(Some(now.into()));
        if outcome.completed {
            active.status = Set(LoanStatus::Completed);
            active.completed_at = Set(Some(now.into()));
            active.due_date = Set(None);
        } else {
            active.status = Set(LoanStatus::Active);
            active.due_date = Set(next_due_date(
                disbursed_on,
                loan.term_months,
                outcome.installments_remaining,
            )?);
        }
        active.updated_at = Set(now.into());
        let updated = active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::LoanRepayment, AuditSubject::Loan, loan.id)
                .with_old(json!({
                    "status": loan.status.as_str(),
                    "balance": loan.balance,
                    "amount_paid": loan.amount_paid,
                }))
                .with_new(json!({
                    "status": updated.status.as_str(),
                    "balance": updated.balance,
                    "amount_paid": updated.amount_paid,
                    "requested": amount,
                    "applied": outcome.applied,
                    "transaction_id": posted.entry.id,
                })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(
            loan_id = %loan_id,
            applied = %outcome.applied,
            balance = %updated.balance,
            status = updated.status.as_str(),
            "Loan repayment recorded"
        );
        Ok(Repayment {
            loan: updated,
            transaction: posted.entry,
        })
    }

    /// Flags overdue loans as defaulted and writes their balance off the
    /// member totals. Returns the number of loans transitioned.
    #[instrument(skip(self))]
    pub async fn process_defaulted_loans(&self) -> SaccoResult<usize> {
        let today = self.ctx.now().date_naive();
        let cutoff = default_cutoff(today, self.ctx.config().loans.default_after_days)?;

        let candidates = LoanRepository::overdue(self.ctx.db(), cutoff).await?;
        let mut defaulted = 0;
        for loan in candidates {
            match self.mark_defaulted(loan.id, cutoff).await {
                Ok(true) => defaulted += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(loan_id = %loan.id, error = %err, "Default processing skipped loan");
                }
            }
        }
        info!(defaulted, "Default sweep finished");
        Ok(defaulted)
    }

    /// Amortization schedule of a loan.
    ///
    /// Loans not yet disbursed are scheduled as if paid out today.
    pub async fn calculate_loan_schedule(
        &self,
        loan_id: Uuid,
    ) -> SaccoResult<Vec<ScheduledInstallment>> {
        let loan = LoanRepository::find(self.ctx.db(), loan_id).await?;
        let start = loan
            .disbursed_date
            .unwrap_or_else(|| self.ctx.now().date_naive());
        let schedule = build_schedule(&ScheduleInput {
            principal: loan.principal_amount,
            total_amount: loan.total_amount,
            monthly_installment: loan.monthly_installment,
            term_months: loan.term_months,
            annual_rate: loan.interest_rate,
            interest_method: loan.interest_method.into(),
            first_due_date: add_months(start, 1)?,
        })?;
        Ok(schedule)
    }

    /// Counts and sums over every loan.
    pub async fn get_loan_summary(&self) -> SaccoResult<LoanSummary> {
        let all = LoanRepository::list(self.ctx.db()).await?;
        let mut summary = LoanSummary {
            total_loans: all.len(),
            ..LoanSummary::default()
        };
        for loan in &all {
            match loan.status {
                LoanStatus::PendingApproval => summary.pending_approval += 1,
                LoanStatus::Approved => summary.approved += 1,
                LoanStatus::Disbursed | LoanStatus::Active => {
                    summary.active += 1;
                    summary.total_outstanding += loan.balance;
                }
                LoanStatus::Completed => summary.completed += 1,
                LoanStatus::Defaulted => {
                    summary.defaulted += 1;
                    summary.total_defaulted += loan.balance;
                }
                LoanStatus::Rejected => summary.rejected += 1,
            }
            if loan.disbursed_date.is_some() {
                summary.total_disbursed += loan.principal_amount;
            }
            summary.total_repaid += loan.amount_paid;
        }
        Ok(summary)
    }

    /// Every product with its usage figures.
    pub async fn get_loan_products_with_stats(&self) -> SaccoResult<Vec<LoanProductStats>> {
        let db = self.ctx.db();
        let products = LoanRepository::list_products(db).await?;
        let mut by_product: HashMap<Uuid, Vec<loans::Model>> = HashMap::new();
        for loan in LoanRepository::list(db).await? {
            by_product.entry(loan.loan_product_id).or_default().push(loan);
        }

        Ok(products
            .into_iter()
            .map(|product| {
                let product_loans = by_product.remove(&product.id).unwrap_or_default();
                let outstanding = product_loans.iter().filter(|loan| loan.status.is_active());
                LoanProductStats {
                    total_loans: product_loans.len(),
                    active_loans: outstanding.clone().count(),
                    total_outstanding: outstanding.map(|loan| loan.balance).sum(),
                    total_disbursed: product_loans
                        .iter()
                        .filter(|loan| loan.disbursed_date.is_some())
                        .map(|loan| loan.principal_amount)
                        .sum(),
                    product,
                }
            })
            .collect())
    }

    /// A member's loans, newest first.
    pub async fn get_member_loans(&self, member_id: Uuid) -> SaccoResult<Vec<loans::Model>> {
        MemberRepository::find(self.ctx.db(), member_id).await?;
        LoanRepository::list_for_member(self.ctx.db(), member_id).await
    }

    /// Finds a loan by id.
    pub async fn get_loan(&self, loan_id: Uuid) -> SaccoResult<loans::Model> {
        LoanRepository::find(self.ctx.db(), loan_id).await
    }

    fn policy(&self) -> EligibilityPolicy {
        EligibilityPolicy::from(&self.ctx.config().loans)
    }

    /// Defaults one loan if it still qualifies under lock.
    async fn mark_defaulted(
        &self,
        loan_id: Uuid,
        cutoff: NaiveDate,
    ) -> SaccoResult<bool> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let unlocked = LoanRepository::find(&txn, loan_id).await?;
        let member = MemberRepository::lock(&txn, unlocked.member_id).await?;
        let loan = LoanRepository::lock(&txn, loan_id).await?;

        let Some(due_date) = loan.due_date else {
            return Ok(false);
        };
        let last_payment = loan
            .last_payment_at
            .map(|at| DateTime::<Utc>::from(at).date_naive());
        if !loan.status.is_active() || !is_in_default(due_date, last_payment, cutoff) {
            return Ok(false);
        }

        MemberRepository::apply_totals(
            &txn,
            &member,
            TotalsDelta {
                loans: -loan.balance,
                ..TotalsDelta::default()
            },
            now,
        )
        .await?;

        let mut active: loans::ActiveModel = loan.clone().into();
        active.status = Set(LoanStatus::Defaulted);
        active.defaulted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let defaulted = active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::LoanDefaulted, AuditSubject::Loan, loan.id)
                .with_old(json!({ "status": loan.status.as_str() }))
                .with_new(json!({
                    "status": defaulted.status.as_str(),
                    "balance_written_off": loan.balance,
                    "due_date": due_date,
                })),
            Actor::System,
            now,
        )
        .await?;
        txn.commit().await?;

        warn!(loan_id = %loan_id, member_id = %member.id, balance = %loan.balance, "Loan defaulted");
        Ok(true)
    }
}

/// Collects the borrower facts the eligibility rules look at.
pub(crate) async fn borrower_snapshot<C: ConnectionTrait>(
    conn: &C,
    member: &members::Model,
) -> SaccoResult<BorrowerSnapshot> {
    let outstanding = LoanRepository::outstanding_for_member(conn, member.id).await?;
    let defaulted = LoanRepository::count_for_member(conn, member.id, LoanStatus::Defaulted).await?;
    Ok(BorrowerSnapshot {
        member_active: member.status == MemberStatus::Active,
        total_savings: member.total_savings,
        total_shares: member.total_shares,
        active_loan_count: u64::try_from(outstanding.len()).unwrap_or(u64::MAX),
        outstanding_balance: outstanding.iter().map(|loan| loan.balance).sum(),
        defaulted_loan_count: defaulted,
    })
}

fn product_terms(product: &loan_products::Model) -> ProductTerms {
    ProductTerms {
        min_amount: product.min_amount,
        max_amount: product.max_amount,
        min_term_months: product.min_term_months,
        max_term_months: product.max_term_months,
        interest_rate: product.interest_rate,
        interest_method: product.interest_method.into(),
        processing_fee_rate: product.processing_fee_rate,
        insurance_fee_rate: product.insurance_fee_rate,
    }
}

fn require_transition(loan: &loans::Model, next: LoanStatus) -> SaccoResult<()> {
    if !loan.status.can_transition_to(next) {
        return Err(SaccoError::InvalidState(format!(
            "Loan {} is {}, cannot become {}",
            loan.loan_number,
            loan.status.as_str(),
            next.as_str()
        )));
    }
    Ok(())
}

fn months(term_months: i32) -> SaccoResult<u32> {
    u32::try_from(term_months)
        .map_err(|_| SaccoError::Internal(format!("Negative loan term {term_months}")))
}

async fn record_transition(
    txn: &DatabaseTransaction,
    action: AuditAction,
    before: &loans::Model,
    after: &loans::Model,
    reason: Option<&str>,
    actor: Actor,
    now: DateTime<Utc>,
) -> SaccoResult<()> {
    AuditLogRepository::record(
        txn,
        AuditEvent::new(action, AuditSubject::Loan, before.id)
            .with_old(json!({ "status": before.status.as_str() }))
            .with_new(json!({ "status": after.status.as_str(), "reason": reason })),
        actor,
        now,
    )
    .await?;
    Ok(())
}
