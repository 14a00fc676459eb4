use std::{fmt, sync::OnceLock};

use regex::Regex;
use uuid::Uuid;

use super::DomainError;

const MAX_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 100;

fn parse_identifier(kind: &'static str, raw: &str) -> Result<String, DomainError> {
    if raw.is_empty() {
        return Err(DomainError::Empty { kind });
    }
    if raw.chars().count() > MAX_ID_LEN {
        return Err(DomainError::TooLong {
            kind,
            max: MAX_ID_LEN,
        });
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !raw.chars().all(allowed) {
        return Err(DomainError::Invalid {
            kind,
            value: raw.to_string(),
        });
    }
    Ok(raw.to_string())
}

fn parse_name(kind: &'static str, raw: &str) -> Result<String, DomainError> {
    if raw.is_empty() {
        return Err(DomainError::Empty { kind });
    }
    if raw.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::TooLong {
            kind,
            max: MAX_NAME_LEN,
        });
    }
    if raw.trim() != raw {
        return Err(DomainError::Untrimmed { kind });
    }
    Ok(raw.to_string())
}

/// Opaque user identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        parse_identifier("user id", raw).map(Self)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque team identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamId(String);

impl TeamId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        parse_identifier("team id", raw).map(Self)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(
                r"^[a-zA-Z0-9_%+-]+(?:\.[a-zA-Z0-9_%+-]+)*@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}$",
            )
            .expect("valid email regex")
        });

        if raw.is_empty() {
            return Err(DomainError::Empty { kind: "email" });
        }
        if !pattern.is_match(raw) {
            return Err(DomainError::Invalid {
                kind: "email",
                value: raw.to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        parse_name("display name", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TeamName(String);

impl TeamName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        parse_name("team name", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Optimistic-locking counter. Starts at 0; only storage advances it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u32);

impl Version {
    pub const INITIAL: Version = Version(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

macro_rules! display_inner {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        )+
    };
}

display_inner!(UserId, TeamId, Email, DisplayName, TeamName, Version);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_opaque_but_bounded() {
        assert_eq!(UserId::parse("u1").unwrap().as_str(), "u1");
        assert!(TeamId::parse("team_A-7").is_ok());
        assert_eq!(
            UserId::parse(""),
            Err(DomainError::Empty { kind: "user id" })
        );
        assert_eq!(
            TeamId::parse("has space"),
            Err(DomainError::Invalid {
                kind: "team id",
                value: "has space".to_string()
            })
        );
        let long = "x".repeat(65);
        assert!(matches!(
            UserId::parse(&long),
            Err(DomainError::TooLong { max: 64, .. })
        ));
    }

    #[test]
    fn generated_ids_parse_back() {
        let id = UserId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(UserId::parse(id.as_str()), Ok(id.clone()));
        assert_ne!(TeamId::generate(), TeamId::generate());
    }

    #[test]
    fn email_format_is_checked() {
        assert!(Email::parse("a@x.com").is_ok());
        assert!(Email::parse("first.last+tag@mail.example.org").is_ok());
        assert_eq!(Email::parse(""), Err(DomainError::Empty { kind: "email" }));
        for bad in ["no-at-sign", "a@x", "a@@x.com", ".a@x.com", "a@x.c"] {
            assert!(Email::parse(bad).is_err(), "{bad} should be rejected");
        }
        assert_eq!(
            Email::parse("bad").unwrap_err().to_string(),
            "invalid email: bad"
        );
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(DisplayName::parse("Alice").unwrap().to_string(), "Alice");
        assert_eq!(
            TeamName::parse(" Core "),
            Err(DomainError::Untrimmed { kind: "team name" })
        );
        assert!(DisplayName::parse(&"a".repeat(100)).is_ok());
        assert_eq!(
            DisplayName::parse(&"a".repeat(101)).unwrap_err().to_string(),
            "display name must not exceed 100 characters"
        );
        assert_eq!(
            TeamName::parse("").unwrap_err().to_string(),
            "team name cannot be empty"
        );
    }
}
