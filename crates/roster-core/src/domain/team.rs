use chrono::{DateTime, Utc};

use super::{DomainError, TeamId, TeamName, Version};

/// A named group. `version` guards concurrent renames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Team {
    id: TeamId,
    name: TeamName,
    version: Version,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(id: TeamId, name: TeamName) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            version: Version::INITIAL,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn restore(
        id: TeamId,
        name: TeamName,
        version: Version,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if updated_at < created_at {
            return Err(DomainError::TimestampsOutOfOrder { kind: "team" });
        }
        Ok(Self {
            id,
            name,
            version,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &TeamName {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn rename(self, name: TeamName) -> Self {
        Self { name, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_team_starts_at_initial_version() {
        let team = Team::new(
            TeamId::parse("t1").unwrap(),
            TeamName::parse("Core").unwrap(),
        );
        assert_eq!(team.version(), Version::INITIAL);
        assert_eq!(team.created_at(), team.updated_at());

        let renamed = team.rename(TeamName::parse("Platform").unwrap());
        assert_eq!(renamed.name().as_str(), "Platform");
        assert_eq!(renamed.version(), Version::INITIAL);
    }
}
