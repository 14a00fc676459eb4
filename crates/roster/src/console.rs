//! Line-oriented command console over stdin/stdout.

use anyhow::{bail, Context};
use roster_core::{
    errors::{UseCaseError, UseCaseErrorKind},
    mediator::Dispatcher,
    usecases::{CreateTeam, CreateUser, GetTeam, GetUser, RenameTeam},
};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const USAGE: &str = "\
commands:
  user add <email> <name...>
  user get <id>
  team add <name...>
  team get <id>
  team rename <id> <version|-> <name...>
  help
  quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    AddUser {
        email: String,
        name: String,
    },
    GetUser {
        id: String,
    },
    AddTeam {
        name: String,
    },
    GetTeam {
        id: String,
    },
    RenameTeam {
        id: String,
        expected_version: Option<u32>,
        name: String,
    },
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let cmd = match (head, rest) {
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        ("user", ["add", email, name @ ..]) if !name.is_empty() => Command::AddUser {
            email: email.to_string(),
            name: name.join(" "),
        },
        ("user", ["get", id]) => Command::GetUser { id: id.to_string() },
        ("team", ["add", name @ ..]) if !name.is_empty() => Command::AddTeam {
            name: name.join(" "),
        },
        ("team", ["get", id]) => Command::GetTeam { id: id.to_string() },
        ("team", ["rename", id, version, name @ ..]) if !name.is_empty() => Command::RenameTeam {
            id: id.to_string(),
            expected_version: parse_version(version)?,
            name: name.join(" "),
        },
        _ => bail!("unrecognised command `{}`", line.trim()),
    };
    Ok(Some(cmd))
}

fn parse_version(raw: &str) -> anyhow::Result<Option<u32>> {
    if raw == "-" {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .with_context(|| format!("version must be a number or `-`, got `{raw}`"))
}

/// Run one command through the dispatcher and render the reply.
pub async fn execute(dispatcher: &Dispatcher, cmd: Command) -> String {
    match cmd {
        Command::AddUser { email, name } => render(
            dispatcher
                .send(CreateUser {
                    display_name: name,
                    email,
                })
                .await,
        ),
        Command::GetUser { id } => render(dispatcher.send(GetUser { user_id: id }).await),
        Command::AddTeam { name } => render(dispatcher.send(CreateTeam { name }).await),
        Command::GetTeam { id } => render(dispatcher.send(GetTeam { team_id: id }).await),
        Command::RenameTeam {
            id,
            expected_version,
            name,
        } => render(
            dispatcher
                .send(RenameTeam {
                    team_id: id,
                    new_name: name,
                    expected_version,
                })
                .await,
        ),
        Command::Help => USAGE.to_string(),
        Command::Quit => String::new(),
    }
}

fn render<T: Serialize>(result: Result<T, UseCaseError>) -> String {
    match result {
        Ok(dto) => serde_json::to_string(&dto)
            .unwrap_or_else(|e| format!("error[unexpected]: cannot render reply: {e}")),
        Err(err) => format!("error[{}]: {}", kind_label(err.kind()), err.message()),
    }
}

fn kind_label(kind: UseCaseErrorKind) -> &'static str {
    match kind {
        UseCaseErrorKind::Validation => "validation",
        UseCaseErrorKind::NotFound => "not_found",
        UseCaseErrorKind::ConcurrencyConflict => "conflict",
        UseCaseErrorKind::Unexpected => "unexpected",
    }
}

/// Read commands until EOF or `quit`, writing one reply per command.
pub async fn run<R, W>(dispatcher: &Dispatcher, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(cmd)) => execute(dispatcher, cmd).await,
            Err(e) => format!("error: {e:#}"),
        };

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
