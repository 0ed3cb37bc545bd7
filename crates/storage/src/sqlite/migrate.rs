use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates activities, sessions, session questions and responses.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS kuet (
                id INTEGER PRIMARY KEY,
                course_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                intro TEXT,
                grade_method INTEGER NOT NULL CHECK (grade_method BETWEEN 0 AND 4),
                completion_answer_all INTEGER NOT NULL DEFAULT 0,
                completion_use_grade INTEGER NOT NULL DEFAULT 0,
                completion_pass_grade INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS kuet_sessions (
                id INTEGER PRIMARY KEY,
                kuet_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                anonymous_answer INTEGER NOT NULL DEFAULT 0,
                session_mode TEXT NOT NULL,
                graded INTEGER NOT NULL DEFAULT 0,
                countdown INTEGER NOT NULL DEFAULT 0,
                show_grade_ranking INTEGER NOT NULL DEFAULT 0,
                random_questions INTEGER NOT NULL DEFAULT 0,
                random_answers INTEGER NOT NULL DEFAULT 0,
                show_feedback INTEGER NOT NULL DEFAULT 0,
                show_final_grade INTEGER NOT NULL DEFAULT 0,
                start_date TEXT,
                end_date TEXT,
                automatic_start INTEGER NOT NULL DEFAULT 0,
                time_mode TEXT NOT NULL,
                session_time INTEGER NOT NULL CHECK (session_time >= 0),
                question_time INTEGER NOT NULL CHECK (question_time >= 0),
                groupings INTEGER,
                status INTEGER NOT NULL CHECK (status BETWEEN 0 AND 2),
                created_at TEXT NOT NULL,
                FOREIGN KEY (kuet_id) REFERENCES kuet(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS kuet_questions (
                id INTEGER PRIMARY KEY,
                session_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                question_order INTEGER NOT NULL CHECK (question_order >= 0),
                FOREIGN KEY (session_id) REFERENCES kuet_sessions(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // kid and question_id are not foreign keys: questions may be removed from
    // a session after users answered them.
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS kuet_questions_responses (
                id INTEGER PRIMARY KEY,
                kuet_id INTEGER NOT NULL,
                session_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                kid INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                anonymise INTEGER NOT NULL DEFAULT 0,
                response TEXT NOT NULL,
                has_feedbacks INTEGER NOT NULL DEFAULT 0,
                result INTEGER NOT NULL CHECK (result BETWEEN 0 AND 5),
                created_at TEXT NOT NULL,
                FOREIGN KEY (kuet_id) REFERENCES kuet(id) ON DELETE CASCADE,
                FOREIGN KEY (session_id) REFERENCES kuet_sessions(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_kuet_sessions_kuet
                ON kuet_sessions (kuet_id, id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_kuet_questions_session_order
                ON kuet_questions (session_id, question_order, id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_kuet_responses_kuet_user_session
                ON kuet_questions_responses (kuet_id, user_id, session_id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(version = 1, "applied sqlite schema migration");

    Ok(())
}
