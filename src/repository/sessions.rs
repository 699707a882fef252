use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use types::domain::Session;

/// In-memory session table; cleared whenever the process restarts.
#[derive(Clone, Default)]
pub struct SessionRepository {
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl SessionRepository {
    pub fn new() -> Self {
        SessionRepository::default()
    }

    pub fn create(&self, session: Session) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(token, session);
        token
    }

    pub fn get(&self, token: Uuid) -> Option<Session> {
        self.sessions.get(&token).map(|s| s.clone())
    }

    pub fn remove(&self, token: Uuid) -> Option<Session> {
        self.sessions.remove(&token).map(|(_, session)| session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_shared_between_clones() {
        let repository = SessionRepository::new();
        let clone = repository.clone();
        let token = repository.create(Session::authenticated("a@x.com".to_string()));
        assert_eq!(
            clone.get(token),
            Some(Session::authenticated("a@x.com".to_string()))
        );
        assert!(clone.remove(token).is_some());
        assert!(repository.get(token).is_none());
    }
}
