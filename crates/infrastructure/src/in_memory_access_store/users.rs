use async_trait::async_trait;
use wardkeep_application::UserRepository;
use wardkeep_core::{AppError, AppResult};
use wardkeep_domain::{User, UserId};

use super::InMemoryAccessStore;

#[async_trait]
impl UserRepository for InMemoryAccessStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn save_user(&self, user: User) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|stored| stored.username() == user.username() && stored.id() != user.id())
        {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                user.username()
            )));
        }

        tables.users.insert(user.id(), user);
        Ok(())
    }
}
