use chrono::{DateTime, Utc};

use super::{DisplayName, DomainError, Email, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    id: UserId,
    display_name: DisplayName,
    email: Email,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, display_name: DisplayName, email: Email) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name,
            email,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a user from stored fields.
    pub fn restore(
        id: UserId,
        display_name: DisplayName,
        email: Email,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if updated_at < created_at {
            return Err(DomainError::TimestampsOutOfOrder { kind: "user" });
        }
        Ok(Self {
            id,
            display_name,
            email,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn change_email(self, email: Email) -> Self {
        Self { email, ..self }
    }

    pub fn rename(self, display_name: DisplayName) -> Self {
        Self {
            display_name,
            ..self
        }
    }
}
