//! Repository port traits.

use async_trait::async_trait;

use snowball_domain::{UserId, UserRecord};

use super::error::RepoError;

// =============================================================================
// Account Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn fetch_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;
}
