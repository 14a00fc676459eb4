//! Domain model: value objects and the `User` / `Team` aggregates.

mod team;
mod user;
mod values;

pub use team::Team;
pub use user::User;
pub use values::{DisplayName, Email, TeamId, TeamName, UserId, Version};

/// Why a raw value could not become a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    #[error("{kind} must not exceed {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error("{kind} cannot have leading or trailing whitespace")]
    Untrimmed { kind: &'static str },

    #[error("invalid {kind}: {value}")]
    Invalid { kind: &'static str, value: String },

    #[error("{kind} was updated before it was created")]
    TimestampsOutOfOrder { kind: &'static str },
}
