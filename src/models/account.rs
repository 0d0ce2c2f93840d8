use time::OffsetDateTime;
use uuid::Uuid;

/// Account as seen by credential recovery: the lookup key and the hash it may overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl Account {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
