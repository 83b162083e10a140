//! In-memory account store.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;

use snowball_domain::{UserId, UserRecord};

use crate::infrastructure::ports::{AccountRepo, RepoError};

#[derive(Default)]
pub struct InMemoryAccountRepo {
    users: DashMap<UserId, UserRecord>,
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let repo = Self::new();
        for user in users {
            repo.insert(user);
        }
        repo
    }

    /// Load a JSON array of account records.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RepoError::storage("load accounts", format!("{}: {e}", path.display())))?;
        let users: Vec<UserRecord> =
            serde_json::from_str(&raw).map_err(RepoError::serialization)?;
        tracing::info!(path = %path.display(), count = users.len(), "Loaded account records");
        Ok(Self::with_users(users))
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&self, id: UserId) -> Option<UserRecord> {
        self.users.remove(&id).map(|(_, user)| user)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl AccountRepo for InMemoryAccountRepo {
    async fn fetch_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn fetches_inserted_user() {
        let repo = InMemoryAccountRepo::with_users([UserRecord::new(UserId::new(1), "p1")]);
        let user = repo.fetch_user_by_id(UserId::new(1)).await.unwrap();
        assert_eq!(user.map(|u| u.username), Some("p1".to_string()));
        assert!(repo.fetch_user_by_id(UserId::new(2)).await.unwrap().is_none());
    }

    #[test]
    fn loads_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 1, "username": "p1"}}, {{"id": 2, "username": "p2", "nickname": "Two"}}]"#
        )
        .unwrap();

        let repo = InMemoryAccountRepo::from_file(file.path()).unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn malformed_file_is_a_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            InMemoryAccountRepo::from_file(file.path()),
            Err(RepoError::Serialization(_))
        ));
    }

    #[test]
    fn missing_file_is_a_storage_error() {
        let result = InMemoryAccountRepo::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(RepoError::Storage { .. })));
    }
}
