use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    domain::{DisplayName, Email, User, UserId},
    errors::UseCaseError,
    mediator::{Request, RequestHandler},
    result::combine_errors,
    unit_of_work::UnitOfWorkFactory,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserDto {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            display_name: user.display_name().to_string(),
            email: user.email().to_string(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateUser {
    pub display_name: String,
    pub email: String,
}

impl Request for CreateUser {
    type Response = Result<UserDto, UseCaseError>;
}

#[derive(Clone, Debug)]
pub struct GetUser {
    pub user_id: String,
}

impl Request for GetUser {
    type Response = Result<UserDto, UseCaseError>;
}

pub struct CreateUserHandler {
    uow: UnitOfWorkFactory,
}

impl CreateUserHandler {
    pub fn new(uow: UnitOfWorkFactory) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler for CreateUserHandler {
    type Request = CreateUser;

    async fn handle(&self, request: CreateUser) -> Result<UserDto, UseCaseError> {
        let (display_name, email) = combine_errors((
            DisplayName::parse(&request.display_name),
            Email::parse(&request.email),
        ))
        .map_err(UseCaseError::invalid_input)?;
        let user = User::new(UserId::generate(), display_name, email);

        let saved = self
            .uow
            .begin()
            .run(|scope| {
                Box::pin(async move {
                    let saved = scope.repository::<User>().add(&user).await?;
                    Ok::<_, UseCaseError>(saved)
                })
            })
            .await;

        match saved {
            Ok(user) => {
                tracing::info!(user_id = %user.id(), "created user");
                Ok(UserDto::from(&user))
            }
            Err(err) => {
                tracing::warn!(error = %err, "create user failed");
                Err(err)
            }
        }
    }
}

pub struct GetUserHandler {
    uow: UnitOfWorkFactory,
}

impl GetUserHandler {
    pub fn new(uow: UnitOfWorkFactory) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler for GetUserHandler {
    type Request = GetUser;

    async fn handle(&self, request: GetUser) -> Result<UserDto, UseCaseError> {
        let user_id = UserId::parse(&request.user_id)?;

        let user = self
            .uow
            .begin()
            .run(|scope| {
                Box::pin(async move {
                    let user = scope.repository::<User>().get_by_id(&user_id).await?;
                    Ok::<_, UseCaseError>(user)
                })
            })
            .await?;

        tracing::debug!(user_id = %user.id(), "loaded user");
        Ok(UserDto::from(&user))
    }
}
