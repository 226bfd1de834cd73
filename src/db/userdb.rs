// db/userdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::User;

/// Identity directory contract. The wallet core only ever needs a lookup by
/// id, to fill transfer descriptions and gateway customer fields.
#[async_trait]
pub trait UserDirectoryExt {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, Error>;
}

#[async_trait]
impl UserDirectoryExt for DBClient {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id,
                first_name,
                last_name,
                email,
                phone_number,
                created_at,
                updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
