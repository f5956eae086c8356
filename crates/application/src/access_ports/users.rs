use async_trait::async_trait;
use wardkeep_core::AppResult;
use wardkeep_domain::{User, UserId};

/// Repository port for staff accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds one user by id.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Creates or replaces a user.
    async fn save_user(&self, user: User) -> AppResult<()>;
}
