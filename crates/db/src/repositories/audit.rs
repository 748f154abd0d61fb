//! Audit log sink.
//!
//! `record` is called with the service's open transaction so the audit row
//! commits or rolls back together with the change it describes.

use chrono::{DateTime, Utc};
use sacco_core::{Actor, AuditEvent, AuditSubject};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entities::audit_logs;
use crate::error::SaccoResult;

/// Append-only audit log access.
#[derive(Debug, Clone, Copy)]
pub struct AuditLogRepository;

impl AuditLogRepository {
    /// Appends one audit row.
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        event: AuditEvent,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> SaccoResult<audit_logs::Model> {
        let row = audit_logs::ActiveModel {
            id: Set(Uuid::now_v7()),
            action: Set(event.action.as_str().to_string()),
            subject_type: Set(event.subject.as_str().to_string()),
            subject_id: Set(event.subject_id),
            old_values: Set(event.old_values),
            new_values: Set(event.new_values),
            actor_id: Set(actor.id()),
            created_at: Set(at.into()),
        };
        Ok(row.insert(conn).await?)
    }

    /// Audit trail of one entity, oldest first.
    pub async fn for_subject<C: ConnectionTrait>(
        conn: &C,
        subject: AuditSubject,
        subject_id: Uuid,
    ) -> SaccoResult<Vec<audit_logs::Model>> {
        Ok(audit_logs::Entity::find()
            .filter(audit_logs::Column::SubjectType.eq(subject.as_str()))
            .filter(audit_logs::Column::SubjectId.eq(subject_id))
            .order_by_asc(audit_logs::Column::CreatedAt)
            .order_by_asc(audit_logs::Column::Id)
            .all(conn)
            .await?)
    }
}
