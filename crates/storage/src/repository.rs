use async_trait::async_trait;
use kuet_core::model::{
    Kuet, KuetId, QuestionId, QuestionResponse, ResponseId, Session, SessionId, SessionQuestion,
    SessionQuestionId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Equality filter over recorded responses.
///
/// `session_id: None` matches responses from every session of the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFilter {
    pub kuet_id: KuetId,
    pub user_id: UserId,
    pub session_id: Option<SessionId>,
}

impl ResponseFilter {
    #[must_use]
    pub fn for_user(kuet_id: KuetId, user_id: UserId) -> Self {
        Self {
            kuet_id,
            user_id,
            session_id: None,
        }
    }

    #[must_use]
    pub fn in_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn matches(&self, response: &QuestionResponse) -> bool {
        response.kuet_id == self.kuet_id
            && response.user_id == self.user_id
            && self.session_id.is_none_or(|id| response.session_id == id)
    }
}

/// Repository contract for activity instances.
#[async_trait]
pub trait KuetRepository: Send + Sync {
    /// Persist or update an activity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the activity cannot be stored.
    async fn upsert_kuet(&self, kuet: &Kuet) -> Result<(), StorageError>;

    /// Fetch an activity by ID.
    ///
    /// Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_kuet(&self, id: KuetId) -> Result<Option<Kuet>, StorageError>;
}

/// Repository contract for sessions and the questions attached to them.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a session, ignoring its id, and return the assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning activity is missing.
    async fn insert_session(&self, session: &Session) -> Result<SessionId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError>;

    /// Sessions of an activity ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn sessions_for_kuet(&self, kuet_id: KuetId) -> Result<Vec<Session>, StorageError>;

    /// Attach a question to a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session is missing.
    async fn add_session_question(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        order: u32,
    ) -> Result<SessionQuestionId, StorageError>;

    /// Questions of a session ordered by slot order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn questions_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionQuestion>, StorageError>;
}

/// Repository contract for recorded responses.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Append a response and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session is missing and
    /// `StorageError::Conflict` if the session belongs to another activity.
    async fn append_response(
        &self,
        response: &QuestionResponse,
    ) -> Result<ResponseId, StorageError>;

    /// Responses matching the filter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_responses(
        &self,
        filter: &ResponseFilter,
    ) -> Result<Vec<QuestionResponse>, StorageError>;

    /// Number of responses matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_responses(&self, filter: &ResponseFilter) -> Result<u64, StorageError> {
        let found = self.find_responses(filter).await?;
        Ok(found.len() as u64)
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    kuets: Arc<Mutex<HashMap<KuetId, Kuet>>>,
    sessions: Arc<Mutex<Vec<Session>>>,
    questions: Arc<Mutex<Vec<SessionQuestion>>>,
    responses: Arc<Mutex<Vec<QuestionResponse>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(len: usize) -> u64 {
    len as u64 + 1
}

#[async_trait]
impl KuetRepository for InMemoryRepository {
    async fn upsert_kuet(&self, kuet: &Kuet) -> Result<(), StorageError> {
        let mut guard = self.kuets.lock().map_err(lock_err)?;
        guard.insert(kuet.id(), kuet.clone());
        Ok(())
    }

    async fn get_kuet(&self, id: KuetId) -> Result<Option<Kuet>, StorageError> {
        let guard = self.kuets.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &Session) -> Result<SessionId, StorageError> {
        if !self
            .kuets
            .lock()
            .map_err(lock_err)?
            .contains_key(&session.kuet_id())
        {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        let id = SessionId::new(next_id(guard.len()));
        guard.push(session.clone().with_id(id));
        Ok(id)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let guard = self.sessions.lock().map_err(lock_err)?;
        Ok(guard.iter().find(|s| s.id() == id).cloned())
    }

    async fn sessions_for_kuet(&self, kuet_id: KuetId) -> Result<Vec<Session>, StorageError> {
        let guard = self.sessions.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .filter(|s| s.kuet_id() == kuet_id)
            .cloned()
            .collect())
    }

    async fn add_session_question(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        order: u32,
    ) -> Result<SessionQuestionId, StorageError> {
        if self.get_session(session_id).await?.is_none() {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.questions.lock().map_err(lock_err)?;
        let id = SessionQuestionId::new(next_id(guard.len()));
        guard.push(SessionQuestion {
            id,
            session_id,
            question_id,
            order,
        });
        Ok(id)
    }

    async fn questions_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionQuestion>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut found: Vec<SessionQuestion> = guard
            .iter()
            .filter(|q| q.session_id == session_id)
            .copied()
            .collect();
        found.sort_by_key(|q| (q.order, q.id));
        Ok(found)
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn append_response(
        &self,
        response: &QuestionResponse,
    ) -> Result<ResponseId, StorageError> {
        let session = self
            .get_session(response.session_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if session.kuet_id() != response.kuet_id {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.responses.lock().map_err(lock_err)?;
        let id = ResponseId::new(next_id(guard.len()));
        let mut stored = response.clone();
        stored.id = Some(id);
        guard.push(stored);
        Ok(id)
    }

    async fn find_responses(
        &self,
        filter: &ResponseFilter,
    ) -> Result<Vec<QuestionResponse>, StorageError> {
        let guard = self.responses.lock().map_err(lock_err)?;
        Ok(guard.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn count_responses(&self, filter: &ResponseFilter) -> Result<u64, StorageError> {
        let guard = self.responses.lock().map_err(lock_err)?;
        Ok(guard.iter().filter(|r| filter.matches(r)).count() as u64)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kuets: Arc<dyn KuetRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub responses: Arc<dyn ResponseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let kuets: Arc<dyn KuetRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let responses: Arc<dyn ResponseRepository> = Arc::new(repo);
        Self {
            kuets,
            sessions,
            responses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuet_core::model::{
        CompletionFlags, CourseId, GradeMethod, ResponseResult, SessionSettings, SessionStatus,
    };
    use kuet_core::time::fixed_now;

    fn build_kuet(id: u64) -> Kuet {
        Kuet::new(
            KuetId::new(id),
            CourseId::new(1),
            format!("Kuet {id}"),
            None,
            GradeMethod::None,
            CompletionFlags::answer_all(),
            fixed_now(),
        )
        .unwrap()
    }

    fn build_session(kuet_id: KuetId) -> Session {
        Session::new(
            SessionId::new(0),
            kuet_id,
            "Test Session",
            SessionSettings::default(),
            SessionStatus::Inactive,
            fixed_now(),
        )
        .unwrap()
    }

    fn response(kuet_id: KuetId, session_id: SessionId, user: u64) -> QuestionResponse {
        QuestionResponse::new(
            kuet_id,
            session_id,
            UserId::new(user),
            SessionQuestionId::new(1),
            QuestionId::new(1),
            ResponseResult::Success,
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn session_requires_existing_kuet() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_session(&build_session(KuetId::new(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn filters_responses_by_user_and_session() {
        let repo = InMemoryRepository::new();
        let kuet = build_kuet(1);
        repo.upsert_kuet(&kuet).await.unwrap();
        let first = repo.insert_session(&build_session(kuet.id())).await.unwrap();
        let second = repo.insert_session(&build_session(kuet.id())).await.unwrap();
        assert_ne!(first, second);

        repo.append_response(&response(kuet.id(), first, 2)).await.unwrap();
        repo.append_response(&response(kuet.id(), second, 2)).await.unwrap();
        repo.append_response(&response(kuet.id(), second, 3)).await.unwrap();

        let all = ResponseFilter::for_user(kuet.id(), UserId::new(2));
        assert_eq!(repo.count_responses(&all).await.unwrap(), 2);
        let only_second = all.in_session(second);
        let found = repo.find_responses(&only_second).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id, second);
        assert!(found[0].id.is_some());
    }

    #[tokio::test]
    async fn rejects_response_for_foreign_session() {
        let repo = InMemoryRepository::new();
        let a = build_kuet(1);
        let b = build_kuet(2);
        repo.upsert_kuet(&a).await.unwrap();
        repo.upsert_kuet(&b).await.unwrap();
        let session = repo.insert_session(&build_session(a.id())).await.unwrap();

        let err = repo
            .append_response(&response(b.id(), session, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn session_questions_come_back_in_order() {
        let repo = InMemoryRepository::new();
        let kuet = build_kuet(1);
        repo.upsert_kuet(&kuet).await.unwrap();
        let session = repo.insert_session(&build_session(kuet.id())).await.unwrap();
        repo.add_session_question(session, QuestionId::new(20), 2)
            .await
            .unwrap();
        repo.add_session_question(session, QuestionId::new(10), 1)
            .await
            .unwrap();

        let questions = repo.questions_for_session(session).await.unwrap();
        let ids: Vec<_> = questions.iter().map(|q| q.question_id).collect();
        assert_eq!(ids, vec![QuestionId::new(10), QuestionId::new(20)]);
    }
}
