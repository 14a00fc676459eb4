//! Application use cases, one request type and handler each.

mod teams;
mod users;

pub use teams::{
    CreateTeam, CreateTeamHandler, GetTeam, GetTeamHandler, RenameTeam, RenameTeamHandler,
    TeamDto,
};
pub use users::{CreateUser, CreateUserHandler, GetUser, GetUserHandler, UserDto};

use crate::{mediator::Dispatcher, unit_of_work::UnitOfWorkFactory};

/// Dispatcher with every roster handler registered.
///
/// # Panics
///
/// If a request type lacks its handler.
pub fn dispatcher(uow: UnitOfWorkFactory) -> Dispatcher {
    Dispatcher::builder()
        .register(CreateUserHandler::new(uow.clone()))
        .register(GetUserHandler::new(uow.clone()))
        .register(CreateTeamHandler::new(uow.clone()))
        .register(GetTeamHandler::new(uow.clone()))
        .register(RenameTeamHandler::new(uow))
        .declare::<CreateUser>()
        .declare::<GetUser>()
        .declare::<CreateTeam>()
        .declare::<GetTeam>()
        .declare::<RenameTeam>()
        .build()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{DisplayName, Email, User, UserId},
        errors::{RepositoryError, UseCaseError, UseCaseErrorKind},
        mapping::StorageRecord,
        records::{self, UserRecord},
        storage::{MemoryStore, StorageSession},
    };

    fn roster() -> (Dispatcher, MemoryStore) {
        let store = MemoryStore::new();
        let factory =
            UnitOfWorkFactory::new(Arc::new(store.clone()), Arc::new(records::mapping_registry()));
        (dispatcher(factory), store)
    }

    fn create_user(name: &str, email: &str) -> CreateUser {
        CreateUser {
            display_name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn every_request_type_is_routed() {
        let (dispatcher, _) = roster();
        assert_eq!(dispatcher.len(), 5);
        assert!(dispatcher.handles::<CreateUser>());
        assert!(dispatcher.handles::<RenameTeam>());
    }

    #[tokio::test]
    async fn created_user_can_be_read_back() {
        let (dispatcher, _) = roster();

        let created = dispatcher
            .send(create_user("Alice", "a@x.com"))
            .await
            .unwrap();
        let loaded = dispatcher
            .send(GetUser {
                user_id: created.id.clone(),
            })
            .await
            .unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.display_name, "Alice");
        assert_eq!(loaded.email, "a@x.com");
    }

    #[tokio::test]
    async fn every_invalid_field_is_reported() {
        let (dispatcher, store) = roster();

        let err = dispatcher
            .send(create_user(" Alice", "not-an-email"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), UseCaseErrorKind::Validation);
        assert_eq!(
            err.message(),
            "display name cannot have leading or trailing whitespace; invalid email: not-an-email"
        );
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let (dispatcher, store) = roster();
        dispatcher
            .send(create_user("Alice", "a@x.com"))
            .await
            .unwrap();

        let err = dispatcher
            .send(create_user("Alicia", "a@x.com"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), UseCaseErrorKind::Validation);
        assert_eq!(err.message(), "a User with this email already exists");
        assert_eq!(store.snapshot().unwrap().table_len("users"), 1);
    }

    fn stored_user(id: &str, name: &str, email: &str) -> User {
        User::new(
            UserId::parse(id).unwrap(),
            DisplayName::parse(name).unwrap(),
            Email::parse(email).unwrap(),
        )
    }

    #[tokio::test]
    async fn email_clash_found_at_commit_names_the_aggregate() {
        let store = MemoryStore::new();
        let factory =
            UnitOfWorkFactory::new(Arc::new(store.clone()), Arc::new(records::mapping_registry()));

        let mut racing = store.session().unwrap();
        racing
            .insert(
                UserRecord::schema(),
                UserRecord::to_record(&stored_user("u2", "Bob", "a@x.com")),
            )
            .await
            .unwrap();

        let err = factory
            .begin()
            .run(|scope| {
                Box::pin(async move {
                    scope
                        .repository::<User>()
                        .add(&stored_user("u1", "Alice", "a@x.com"))
                        .await?;
                    racing.commit().await.map_err(RepositoryError::from)?;
                    Ok::<_, UseCaseError>(())
                })
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), UseCaseErrorKind::Validation);
        assert_eq!(err.message(), "a User with this email already exists");
        assert_eq!(store.snapshot().unwrap().table_len("users"), 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (dispatcher, _) = roster();

        let err = dispatcher
            .send(GetUser {
                user_id: "nobody".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), UseCaseErrorKind::NotFound);
        assert_eq!(err.message(), "User nobody not found");

        let err = dispatcher
            .send(GetTeam {
                team_id: "bad id!".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), UseCaseErrorKind::Validation);
    }

    #[tokio::test]
    async fn rename_bumps_version_and_stamps_update_time() {
        let (dispatcher, _) = roster();
        let team = dispatcher
            .send(CreateTeam {
                name: "Core".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(team.version, 0);

        let renamed = dispatcher
            .send(RenameTeam {
                team_id: team.id.clone(),
                new_name: "Platform".to_string(),
                expected_version: Some(0),
            })
            .await
            .unwrap();

        assert_eq!(renamed.name, "Platform");
        assert_eq!(renamed.version, 1);
        assert_eq!(renamed.created_at, team.created_at);
        assert!(renamed.updated_at >= team.updated_at);

        let loaded = dispatcher
            .send(GetTeam {
                team_id: team.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(loaded, renamed);
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_concurrency_conflict() {
        let (dispatcher, _) = roster();
        let team = dispatcher
            .send(CreateTeam {
                name: "Core".to_string(),
            })
            .await
            .unwrap();
        dispatcher
            .send(RenameTeam {
                team_id: team.id.clone(),
                new_name: "Platform".to_string(),
                expected_version: None,
            })
            .await
            .unwrap();

        let err = dispatcher
            .send(RenameTeam {
                team_id: team.id.clone(),
                new_name: "Infra".to_string(),
                expected_version: Some(0),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), UseCaseErrorKind::ConcurrencyConflict);
        let loaded = dispatcher
            .send(GetTeam { team_id: team.id })
            .await
            .unwrap();
        assert_eq!(loaded.name, "Platform");
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn rename_reports_all_input_errors() {
        let (dispatcher, _) = roster();
        let err = dispatcher
            .send(RenameTeam {
                team_id: String::new(),
                new_name: String::new(),
                expected_version: None,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "team id cannot be empty; team name cannot be empty"
        );
    }
}
