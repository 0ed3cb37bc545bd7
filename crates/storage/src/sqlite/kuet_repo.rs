use kuet_core::model::{Kuet, KuetId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, id_to_i64, map_kuet_row};
use crate::repository::{KuetRepository, StorageError};

#[async_trait::async_trait]
impl KuetRepository for SqliteRepository {
    async fn upsert_kuet(&self, kuet: &Kuet) -> Result<(), StorageError> {
        let completion = kuet.completion();

        sqlx::query(
            r"
            INSERT INTO kuet (
                id, course_id, name, intro, grade_method,
                completion_answer_all, completion_use_grade, completion_pass_grade, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                name = excluded.name,
                intro = excluded.intro,
                grade_method = excluded.grade_method,
                completion_answer_all = excluded.completion_answer_all,
                completion_use_grade = excluded.completion_use_grade,
                completion_pass_grade = excluded.completion_pass_grade
            ",
        )
        .bind(id_to_i64("kuet_id", kuet.id().value())?)
        .bind(id_to_i64("course_id", kuet.course_id().value())?)
        .bind(kuet.name().to_owned())
        .bind(kuet.intro().map(ToOwned::to_owned))
        .bind(kuet.grade_method().code())
        .bind(bool_to_i64(completion.answer_all))
        .bind(bool_to_i64(completion.use_grade))
        .bind(bool_to_i64(completion.pass_grade))
        .bind(kuet.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_kuet(&self, id: KuetId) -> Result<Option<Kuet>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, course_id, name, intro, grade_method,
                completion_answer_all, completion_use_grade, completion_pass_grade, created_at
            FROM kuet
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("kuet_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_kuet_row).transpose()
    }
}
