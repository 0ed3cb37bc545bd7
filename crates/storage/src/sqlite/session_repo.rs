use kuet_core::model::{KuetId, QuestionId, Session, SessionId, SessionQuestion, SessionQuestionId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, id_to_i64, map_session_question_row, map_session_row};
use crate::repository::{SessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, kuet_id, name, anonymous_answer, session_mode, graded, countdown,
    show_grade_ranking, random_questions, random_answers, show_feedback,
    show_final_grade, start_date, end_date, automatic_start, time_mode,
    session_time, question_time, groupings, status, created_at
";

/// Foreign key violations mean the parent row is missing.
fn insert_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => conn(e),
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &Session) -> Result<SessionId, StorageError> {
        let s = session.settings();
        let groupings = s
            .groupings
            .map(|g| id_to_i64("groupings", g))
            .transpose()?;

        let res = sqlx::query(
            r"
            INSERT INTO kuet_sessions (
                kuet_id, name, anonymous_answer, session_mode, graded, countdown,
                show_grade_ranking, random_questions, random_answers, show_feedback,
                show_final_grade, start_date, end_date, automatic_start, time_mode,
                session_time, question_time, groupings, status, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ",
        )
        .bind(id_to_i64("kuet_id", session.kuet_id().value())?)
        .bind(session.name().to_owned())
        .bind(bool_to_i64(s.anonymous_answer))
        .bind(s.mode.as_str())
        .bind(bool_to_i64(s.graded))
        .bind(bool_to_i64(s.countdown))
        .bind(bool_to_i64(s.show_grade_ranking))
        .bind(bool_to_i64(s.random_questions))
        .bind(bool_to_i64(s.random_answers))
        .bind(bool_to_i64(s.show_feedback))
        .bind(bool_to_i64(s.show_final_grade))
        .bind(s.start_date)
        .bind(s.end_date)
        .bind(bool_to_i64(s.automatic_start))
        .bind(s.time_mode.as_str())
        .bind(i64::from(s.session_time))
        .bind(i64::from(s.question_time))
        .bind(groupings)
        .bind(session.status().code())
        .bind(session.created_at())
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;

        Ok(SessionId::new(u64::try_from(res.last_insert_rowid()).map_err(
            |_| StorageError::Serialization("session id sign overflow".into()),
        )?))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM kuet_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn sessions_for_kuet(&self, kuet_id: KuetId) -> Result<Vec<Session>, StorageError> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM kuet_sessions WHERE kuet_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("kuet_id", kuet_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_session_row).collect()
    }

    async fn add_session_question(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        order: u32,
    ) -> Result<SessionQuestionId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO kuet_questions (session_id, question_id, question_order)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_to_i64("session_id", session_id.value())?)
        .bind(id_to_i64("question_id", question_id.value())?)
        .bind(i64::from(order))
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;

        Ok(SessionQuestionId::new(
            u64::try_from(res.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("kid sign overflow".into()))?,
        ))
    }

    async fn questions_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, question_id, question_order
            FROM kuet_questions
            WHERE session_id = ?1
            ORDER BY question_order ASC, id ASC
            ",
        )
        .bind(id_to_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_session_question_row).collect()
    }
}
