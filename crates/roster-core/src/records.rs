//! Storage shapes of the roster aggregates.

use crate::{
    domain::{DisplayName, Email, Team, TeamId, TeamName, User, UserId, Version},
    mapping::{Aggregate, Field, MappingRegistry, Primitive},
};

impl Aggregate for User {
    type Id = UserId;
    const NAME: &'static str = "User";

    fn id(&self) -> &UserId {
        User::id(self)
    }
}

impl Aggregate for Team {
    type Id = TeamId;
    const NAME: &'static str = "Team";

    fn id(&self) -> &TeamId {
        Team::id(self)
    }
}

macro_rules! text_field {
    ($($ty:ty),+) => {
        $(
            impl Field for $ty {
                fn to_primitive(&self) -> Primitive {
                    Primitive::Text(self.as_str().to_string())
                }

                fn from_primitive(value: Primitive) -> Result<Self, String> {
                    let raw = String::from_primitive(value)?;
                    <$ty>::parse(&raw).map_err(|err| err.to_string())
                }
            }
        )+
    };
}

text_field!(UserId, TeamId, Email, DisplayName, TeamName);

impl Field for Version {
    fn to_primitive(&self) -> Primitive {
        Primitive::Integer(i64::from(self.value()))
    }

    fn from_primitive(value: Primitive) -> Result<Self, String> {
        let raw = i64::from_primitive(value)?;
        u32::try_from(raw)
            .map(Version::new)
            .map_err(|_| format!("version {raw} is out of range"))
    }
}

crate::storage_record! {
    pub struct UserRecord => User {
        table: "users",
        key: id,
        fields: {
            id: UserId,
            display_name: DisplayName,
            #[unique] email: Email,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: chrono::DateTime<chrono::Utc>,
        },
        updated_at: updated_at,
        restore: User::restore,
    }
}

crate::storage_record! {
    pub struct TeamRecord => Team {
        table: "teams",
        key: id,
        fields: {
            id: TeamId,
            name: TeamName,
            version: Version,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: chrono::DateTime<chrono::Utc>,
        },
        version: version,
        updated_at: updated_at,
        restore: Team::restore,
    }
}

/// Registry with every roster aggregate mapped.
pub fn mapping_registry() -> MappingRegistry {
    MappingRegistry::builder()
        .register::<UserRecord>()
        .register::<TeamRecord>()
        .build()
}
