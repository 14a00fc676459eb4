use crate::domain::DomainError;

/// Bootstrap error type for the roster core.
///
/// Covers failures that happen while wiring the process (config and
/// logging). Business outcomes never use this type; they travel as
/// [`RepositoryError`] / [`UseCaseError`] inside `Err`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a storage session (the port-level vocabulary).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("unique constraint violated on {table}.{field}")]
    UniqueViolation {
        table: &'static str,
        field: &'static str,
    },

    #[error("no row with key {key} in {table}")]
    MissingRow { table: &'static str, key: String },

    #[error("stale write to {table} row {key}")]
    StaleWrite { table: &'static str, key: String },

    #[error("storage session is closed")]
    Closed,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Conversion failures between aggregates and storage records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("{aggregate}.{field}: malformed primitive: {reason}")]
    MalformedPrimitive {
        aggregate: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("no mapping entry registered for {aggregate}")]
    NoMappingEntry { aggregate: &'static str },

    #[error("{aggregate} rejected stored fields: {reason}")]
    InvariantViolation {
        aggregate: &'static str,
        reason: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepositoryErrorKind {
    NotFound,
    Conflict,
    VersionConflict,
    Unexpected,
}

/// Storage-layer outcomes of a repository operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{aggregate} {key} not found")]
    NotFound { aggregate: &'static str, key: String },

    #[error("{aggregate} conflicts with an existing record on `{field}`")]
    Conflict {
        aggregate: &'static str,
        field: &'static str,
    },

    #[error("{aggregate} {key} was modified concurrently")]
    VersionConflict { aggregate: &'static str, key: String },

    #[error("mapping failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("unexpected storage failure: {0}")]
    Unexpected(String),
}

impl RepositoryError {
    /// Translate a storage failure, naming the aggregate the caller was working on.
    pub fn from_storage(aggregate: &'static str, err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation { field, .. } => Self::Conflict { aggregate, field },
            StorageError::MissingRow { key, .. } => Self::NotFound { aggregate, key },
            StorageError::StaleWrite { key, .. } => Self::VersionConflict { aggregate, key },
            other @ (StorageError::Closed | StorageError::Backend(_)) => {
                Self::Unexpected(other.to_string())
            }
        }
    }

    /// Mapping failures count as unexpected: they mean stored data is corrupt.
    pub fn kind(&self) -> RepositoryErrorKind {
        match self {
            Self::NotFound { .. } => RepositoryErrorKind::NotFound,
            Self::Conflict { .. } => RepositoryErrorKind::Conflict,
            Self::VersionConflict { .. } => RepositoryErrorKind::VersionConflict,
            Self::Mapping(_) | Self::Unexpected(_) => RepositoryErrorKind::Unexpected,
        }
    }
}

/// Commit-time failures carry only the table name.
impl From<StorageError> for RepositoryError {
    fn from(err: StorageError) -> Self {
        let table: &'static str = match &err {
            StorageError::UniqueViolation { table, .. }
            | StorageError::MissingRow { table, .. }
            | StorageError::StaleWrite { table, .. } => *table,
            StorageError::Closed | StorageError::Backend(_) => "storage",
        };
        Self::from_storage(table, err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UseCaseErrorKind {
    Validation,
    NotFound,
    ConcurrencyConflict,
    Unexpected,
}

/// Handler-layer outcomes returned to callers of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UseCaseError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ConcurrencyConflict(String),

    #[error("{0}")]
    Unexpected(String),
}

impl UseCaseError {
    pub fn kind(&self) -> UseCaseErrorKind {
        match self {
            Self::Validation(_) => UseCaseErrorKind::Validation,
            Self::NotFound(_) => UseCaseErrorKind::NotFound,
            Self::ConcurrencyConflict(_) => UseCaseErrorKind::ConcurrencyConflict,
            Self::Unexpected(_) => UseCaseErrorKind::Unexpected,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::NotFound(m)
            | Self::ConcurrencyConflict(m)
            | Self::Unexpected(m) => m,
        }
    }

    /// Fold several input errors into one validation failure.
    pub fn invalid_input(errors: Vec<DomainError>) -> Self {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation(joined)
    }
}

impl From<RepositoryError> for UseCaseError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { aggregate, field } => {
                Self::Validation(format!("a {aggregate} with this {field} already exists"))
            }
            RepositoryError::NotFound { .. } => Self::NotFound(err.to_string()),
            RepositoryError::VersionConflict { .. } => Self::ConcurrencyConflict(format!(
                "{err}; reload and try again"
            )),
            RepositoryError::Mapping(_) | RepositoryError::Unexpected(_) => {
                Self::Unexpected(err.to_string())
            }
        }
    }
}

impl From<DomainError> for UseCaseError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_keep_their_category() {
        let conflict = RepositoryError::from_storage(
            "User",
            StorageError::UniqueViolation {
                table: "users",
                field: "email",
            },
        );
        assert_eq!(conflict.kind(), RepositoryErrorKind::Conflict);

        let missing = RepositoryError::from_storage(
            "User",
            StorageError::MissingRow {
                table: "users",
                key: "u1".to_string(),
            },
        );
        assert_eq!(missing.kind(), RepositoryErrorKind::NotFound);
        assert_eq!(missing.to_string(), "User u1 not found");

        let backend = RepositoryError::from_storage("User", StorageError::Backend("disk".into()));
        assert_eq!(backend.kind(), RepositoryErrorKind::Unexpected);
    }

    #[test]
    fn mapping_failures_are_unexpected() {
        let err = RepositoryError::from(MappingError::NoMappingEntry { aggregate: "User" });
        assert_eq!(err.kind(), RepositoryErrorKind::Unexpected);
    }

    #[test]
    fn use_case_translation_keeps_not_found_apart_from_unexpected() {
        let not_found = UseCaseError::from(RepositoryError::NotFound {
            aggregate: "Team",
            key: "t1".to_string(),
        });
        assert_eq!(not_found.kind(), UseCaseErrorKind::NotFound);

        let unexpected = UseCaseError::from(RepositoryError::Unexpected("boom".to_string()));
        assert_eq!(unexpected.kind(), UseCaseErrorKind::Unexpected);

        let conflict = UseCaseError::from(RepositoryError::Conflict {
            aggregate: "User",
            field: "email",
        });
        assert_eq!(conflict.kind(), UseCaseErrorKind::Validation);
        assert_eq!(conflict.message(), "a User with this email already exists");

        let stale = UseCaseError::from(RepositoryError::VersionConflict {
            aggregate: "Team",
            key: "t1".to_string(),
        });
        assert_eq!(stale.kind(), UseCaseErrorKind::ConcurrencyConflict);
    }

    #[test]
    fn invalid_input_joins_every_message() {
        let err = UseCaseError::invalid_input(vec![
            DomainError::Empty { kind: "display name" },
            DomainError::Invalid {
                kind: "email",
                value: "nope".to_string(),
            },
        ]);
        assert_eq!(
            err.message(),
            "display name cannot be empty; invalid email: nope"
        );
    }
}
