use kuet_core::model::{QuestionResponse, ResponseId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, id_to_i64, map_response_row, ser};
use crate::repository::{ResponseFilter, ResponseRepository, StorageError};

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn append_response(
        &self,
        response: &QuestionResponse,
    ) -> Result<ResponseId, StorageError> {
        let kuet_id = id_to_i64("kuet_id", response.kuet_id.value())?;
        let session_id = id_to_i64("session_id", response.session_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let owner = sqlx::query("SELECT kuet_id FROM kuet_sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        if owner.try_get::<i64, _>("kuet_id").map_err(ser)? != kuet_id {
            return Err(StorageError::Conflict);
        }

        let res = sqlx::query(
            r"
                INSERT INTO kuet_questions_responses (
                    kuet_id, session_id, user_id, kid, question_id,
                    anonymise, response, has_feedbacks, result, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(kuet_id)
        .bind(session_id)
        .bind(id_to_i64("user_id", response.user_id.value())?)
        .bind(id_to_i64("kid", response.session_question_id.value())?)
        .bind(id_to_i64("question_id", response.question_id.value())?)
        .bind(bool_to_i64(response.anonymise))
        .bind(response.response.clone())
        .bind(bool_to_i64(response.has_feedbacks))
        .bind(response.result.code())
        .bind(response.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        Ok(ResponseId::new(u64::try_from(res.last_insert_rowid()).map_err(
            |_| StorageError::Serialization("response id sign overflow".into()),
        )?))
    }

    async fn find_responses(
        &self,
        filter: &ResponseFilter,
    ) -> Result<Vec<QuestionResponse>, StorageError> {
        let session = filter
            .session_id
            .map(|id| id_to_i64("session_id", id.value()))
            .transpose()?;

        // ?3 IS NULL selects every session of the activity.
        let rows = sqlx::query(
            r"
                SELECT
                    id, kuet_id, session_id, user_id, kid, question_id,
                    anonymise, response, has_feedbacks, result, created_at
                FROM kuet_questions_responses
                WHERE kuet_id = ?1 AND user_id = ?2 AND (?3 IS NULL OR session_id = ?3)
                ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("kuet_id", filter.kuet_id.value())?)
        .bind(id_to_i64("user_id", filter.user_id.value())?)
        .bind(session)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_response_row).collect()
    }

    async fn count_responses(&self, filter: &ResponseFilter) -> Result<u64, StorageError> {
        let session = filter
            .session_id
            .map(|id| id_to_i64("session_id", id.value()))
            .transpose()?;

        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS n
                FROM kuet_questions_responses
                WHERE kuet_id = ?1 AND user_id = ?2 AND (?3 IS NULL OR session_id = ?3)
            ",
        )
        .bind(id_to_i64("kuet_id", filter.kuet_id.value())?)
        .bind(id_to_i64("user_id", filter.user_id.value())?)
        .bind(session)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
