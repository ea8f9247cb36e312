//! Student and session management: the FK targets of the ledger, plus the
//! full-account purge.

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    EngineError, LedgerEvent, ResultEngine, Session, Student, receipts, sessions, students,
};

use super::entries::delete_entries_for;
use super::{Engine, normalize_required_name, with_tx};

pub(crate) async fn require_student<C: ConnectionTrait>(
    conn: &C,
    student_id: i64,
) -> ResultEngine<students::Model> {
    students::Entity::find_by_id(student_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("student not exists".to_string()))
}

pub(crate) async fn require_session<C: ConnectionTrait>(
    conn: &C,
    session_id: i64,
) -> ResultEngine<sessions::Model> {
    sessions::Entity::find_by_id(session_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("session not exists".to_string()))
}

impl Engine {
    /// Register a new student account.
    pub async fn new_student(&self, name: &str) -> ResultEngine<i64> {
        let name = normalize_required_name(name, "student")?;
        let model = students::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(name),
        }
        .insert(&self.database)
        .await?;
        Ok(model.id)
    }

    /// Return a student by id.
    pub async fn student(&self, student_id: i64) -> ResultEngine<Student> {
        let model = require_student(&self.database, student_id).await?;
        Ok(Student::from(model))
    }

    /// Create an academic session (e.g. "2026-27").
    pub async fn new_session(
        &self,
        name: &str,
        starts_on: Date,
        ends_on: Date,
    ) -> ResultEngine<i64> {
        let name = normalize_required_name(name, "session")?;
        if starts_on >= ends_on {
            return Err(EngineError::InvalidEntry(
                "session must start before it ends".to_string(),
            ));
        }
        let existing = sessions::Entity::find()
            .filter(sessions::Column::Name.eq(name.clone()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(name));
        }

        let model = sessions::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(name),
            starts_on: ActiveValue::Set(starts_on),
            ends_on: ActiveValue::Set(ends_on),
        }
        .insert(&self.database)
        .await?;
        Ok(model.id)
    }

    /// Return a session by id.
    pub async fn session(&self, session_id: i64) -> ResultEngine<Session> {
        let model = require_session(&self.database, session_id).await?;
        Ok(Session::from(model))
    }

    /// Delete a student and purge their whole account: ledger entries,
    /// receipts, and the student row, in one transaction. The only
    /// destructive path in the system.
    pub async fn delete_student(&self, student_id: i64) -> ResultEngine<()> {
        with_tx!(self, |tx| {
            require_student(&tx, student_id).await?;

            delete_entries_for(&tx, student_id).await?;
            receipts::Entity::delete_many()
                .filter(receipts::Column::StudentId.eq(student_id))
                .exec(&tx)
                .await?;
            students::Entity::delete_by_id(student_id).exec(&tx).await?;
            Ok(())
        })?;

        tracing::info!(student_id, "purged student account");
        self.notify(LedgerEvent::StudentPurged { student_id });
        Ok(())
    }
}
