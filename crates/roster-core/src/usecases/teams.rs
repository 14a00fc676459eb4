use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    domain::{Team, TeamId, TeamName},
    errors::UseCaseError,
    mediator::{Request, RequestHandler},
    result::combine_errors,
    unit_of_work::UnitOfWorkFactory,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TeamDto {
    pub id: String,
    pub name: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Team> for TeamDto {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id().to_string(),
            name: team.name().to_string(),
            version: team.version().value(),
            created_at: team.created_at(),
            updated_at: team.updated_at(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateTeam {
    pub name: String,
}

impl Request for CreateTeam {
    type Response = Result<TeamDto, UseCaseError>;
}

#[derive(Clone, Debug)]
pub struct GetTeam {
    pub team_id: String,
}

impl Request for GetTeam {
    type Response = Result<TeamDto, UseCaseError>;
}

/// Rename a team. With `expected_version`, the rename is refused unless the
/// stored team is still at that version.
#[derive(Clone, Debug)]
pub struct RenameTeam {
    pub team_id: String,
    pub new_name: String,
    pub expected_version: Option<u32>,
}

impl Request for RenameTeam {
    type Response = Result<TeamDto, UseCaseError>;
}

pub struct CreateTeamHandler {
    uow: UnitOfWorkFactory,
}

impl CreateTeamHandler {
    pub fn new(uow: UnitOfWorkFactory) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler for CreateTeamHandler {
    type Request = CreateTeam;

    async fn handle(&self, request: CreateTeam) -> Result<TeamDto, UseCaseError> {
        let name = TeamName::parse(&request.name)?;
        let team = Team::new(TeamId::generate(), name);

        let team = self
            .uow
            .begin()
            .run(|scope| {
                Box::pin(async move {
                    let saved = scope.repository::<Team>().add(&team).await?;
                    Ok::<_, UseCaseError>(saved)
                })
            })
            .await?;

        tracing::info!(team_id = %team.id(), "created team");
        Ok(TeamDto::from(&team))
    }
}

pub struct GetTeamHandler {
    uow: UnitOfWorkFactory,
}

impl GetTeamHandler {
    pub fn new(uow: UnitOfWorkFactory) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler for GetTeamHandler {
    type Request = GetTeam;

    async fn handle(&self, request: GetTeam) -> Result<TeamDto, UseCaseError> {
        let team_id = TeamId::parse(&request.team_id)?;

        let team = self
            .uow
            .begin()
            .run(|scope| {
                Box::pin(async move {
                    let team = scope.repository::<Team>().get_by_id(&team_id).await?;
                    Ok::<_, UseCaseError>(team)
                })
            })
            .await?;

        Ok(TeamDto::from(&team))
    }
}

pub struct RenameTeamHandler {
    uow: UnitOfWorkFactory,
}

impl RenameTeamHandler {
    pub fn new(uow: UnitOfWorkFactory) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl RequestHandler for RenameTeamHandler {
    type Request = RenameTeam;

    async fn handle(&self, request: RenameTeam) -> Result<TeamDto, UseCaseError> {
        let (team_id, new_name) = combine_errors((
            TeamId::parse(&request.team_id),
            TeamName::parse(&request.new_name),
        ))
        .map_err(UseCaseError::invalid_input)?;
        let expected = request.expected_version;

        let renamed = self
            .uow
            .begin()
            .run(|scope| {
                Box::pin(async move {
                    let teams = scope.repository::<Team>();
                    let team = teams.get_by_id(&team_id).await?;

                    if let Some(expected) = expected {
                        if team.version().value() != expected {
                            return Err(UseCaseError::ConcurrencyConflict(format!(
                                "Team {team_id} is at version {}, not {expected}; reload and try again",
                                team.version()
                            )));
                        }
                    }

                    let renamed = teams.update(&team.rename(new_name)).await?;
                    Ok::<_, UseCaseError>(renamed)
                })
            })
            .await;

        match renamed {
            Ok(team) => {
                tracing::info!(team_id = %team.id(), version = %team.version(), "renamed team");
                Ok(TeamDto::from(&team))
            }
            Err(err) => {
                tracing::warn!(team_id = %request.team_id, error = %err, "rename team failed");
                Err(err)
            }
        }
    }
}
