//! Maps parsed commands onto clan service calls.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use clan_core::{ClanCharter, GameDefinition, Metadata, PublicId};
use clan_runtime::{ClanService, ClanUpdate, EntityStore, NewPlayer};
use serde::Serialize;
use serde_json::{Value, json};

use crate::args::{ClanCommand, ClanRef, Command, GameCommand, HookCommand, MemberCommand, PlayerCommand};

/// Runs one command and returns what should be printed.
pub fn execute<S: EntityStore>(service: &ClanService<S>, command: Command) -> Result<Value> {
    match command {
        Command::Health => Ok(json!({ "status": service.health_check()? })),
        Command::Game(command) => game(service, command),
        Command::Player(command) => player(service, command),
        Command::Clan(command) => clan(service, command),
        Command::Member(command) => member(service, command),
        Command::Hook(command) => hook(service, command),
    }
}

fn game<S: EntityStore>(service: &ClanService<S>, command: GameCommand) -> Result<Value> {
    match command {
        GameCommand::Upsert { file } => {
            let definition: GameDefinition = serde_json::from_str(&read_input(&file)?)
                .context("Invalid game definition")?;
            output(service.upsert_game(definition)?)
        }
        GameCommand::Get { game } => output(service.get_game(&game.into())?),
        GameCommand::List => output(service.list_games()?),
    }
}

fn player<S: EntityStore>(service: &ClanService<S>, command: PlayerCommand) -> Result<Value> {
    match command {
        PlayerCommand::Create {
            game,
            player,
            name,
            metadata,
        } => {
            let new = NewPlayer {
                public_id: player.into(),
                name,
                metadata: parse_metadata(metadata)?,
            };
            output(service.create_player(&game.into(), new)?)
        }
        PlayerCommand::Update {
            game,
            player,
            name,
            metadata,
        } => {
            let game = PublicId::from(game);
            let player = PublicId::from(player);
            let metadata = match metadata {
                Some(raw) => parse_metadata(Some(raw))?,
                None => service.get_player(&game, &player)?.player.metadata,
            };
            output(service.update_player(&game, &player, name, metadata)?)
        }
        PlayerCommand::Get { game, player } => {
            output(service.get_player(&game.into(), &player.into())?)
        }
    }
}

fn clan<S: EntityStore>(service: &ClanService<S>, command: ClanCommand) -> Result<Value> {
    match command {
        ClanCommand::Create {
            game,
            owner,
            clan,
            name,
            metadata,
            closed,
            auto_join,
        } => {
            let charter = ClanCharter {
                public_id: clan.into(),
                name,
                metadata: parse_metadata(metadata)?,
                allow_application: !closed,
                auto_join,
            };
            output(service.create_clan(&game.into(), &owner.into(), charter)?)
        }
        ClanCommand::Update {
            game,
            owner,
            clan,
            name,
            metadata,
            allow_application,
            auto_join,
        } => {
            let update = ClanUpdate {
                name,
                metadata: metadata.map(|raw| parse_metadata(Some(raw))).transpose()?,
                allow_application,
                auto_join,
            };
            output(service.update_clan(&game.into(), &clan.into(), &owner.into(), update)?)
        }
        ClanCommand::Get { game, clan } => output(service.get_clan(&game.into(), &clan.into())?),
        ClanCommand::List { game } => output(service.list_clans(&game.into())?),
        ClanCommand::Search { game, term } => output(service.search_clans(&game.into(), &term)?),
    }
}

fn member<S: EntityStore>(service: &ClanService<S>, command: MemberCommand) -> Result<Value> {
    let delta = match command {
        MemberCommand::Apply {
            at,
            player,
            message,
        } => {
            let (game, clan) = ids(at);
            service.apply(&game, &clan, &player.into(), message)?
        }
        MemberCommand::Invite {
            at,
            player,
            by,
            message,
        } => {
            let (game, clan) = ids(at);
            service.invite(&game, &clan, &player.into(), &by.into(), message)?
        }
        MemberCommand::ApproveApplication { at, player, by } => {
            let (game, clan) = ids(at);
            service.approve_application(&game, &clan, &player.into(), &by.into())?
        }
        MemberCommand::DenyApplication { at, player, by } => {
            let (game, clan) = ids(at);
            service.deny_application(&game, &clan, &player.into(), &by.into())?
        }
        MemberCommand::ApproveInvitation { at, player } => {
            let (game, clan) = ids(at);
            service.approve_invitation(&game, &clan, &player.into())?
        }
        MemberCommand::DenyInvitation { at, player } => {
            let (game, clan) = ids(at);
            service.deny_invitation(&game, &clan, &player.into())?
        }
        MemberCommand::Promote { at, player, by } => {
            let (game, clan) = ids(at);
            service.promote(&game, &clan, &player.into(), &by.into())?
        }
        MemberCommand::Demote { at, player, by } => {
            let (game, clan) = ids(at);
            service.demote(&game, &clan, &player.into(), &by.into())?
        }
        MemberCommand::Delete { at, player, by } => {
            let (game, clan) = ids(at);
            service.delete_member(&game, &clan, &player.into(), &by.into())?
        }
        MemberCommand::Leave { at, player } => {
            let (game, clan) = ids(at);
            service.leave(&game, &clan, &player.into())?
        }
        MemberCommand::Transfer {
            at,
            owner,
            new_owner,
        } => {
            let (game, clan) = ids(at);
            service.transfer_ownership(&game, &clan, &owner.into(), &new_owner.into())?
        }
    };
    output(delta)
}

fn hook<S: EntityStore>(service: &ClanService<S>, command: HookCommand) -> Result<Value> {
    match command {
        HookCommand::Register {
            game,
            hook,
            kind,
            url,
        } => output(service.register_hook(&game.into(), hook.into(), kind, url)?),
        HookCommand::Remove { game, hook } => {
            service.remove_hook(&game.into(), &hook.clone().into())?;
            Ok(json!({ "removed": hook }))
        }
        HookCommand::List { game, kind } => output(service.list_hooks(&game.into(), kind)?),
    }
}

fn ids(at: ClanRef) -> (PublicId, PublicId) {
    (at.game.into(), at.clan.into())
}

fn output<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn parse_metadata(raw: Option<String>) -> Result<Metadata> {
    match raw {
        Some(raw) => serde_json::from_str(&raw).context("Metadata must be a JSON object"),
        None => Ok(Metadata::new()),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clan_runtime::{EventBus, InMemoryStore};

    use super::*;
    use crate::args::Cli;
    use clap::Parser;

    fn run(service: &ClanService<InMemoryStore>, args: &[&str]) -> Result<Value> {
        let cli = Cli::try_parse_from(std::iter::once("clanctl").chain(args.iter().copied()))?;
        execute(service, cli.command)
    }

    #[test]
    fn drives_a_clan_from_the_command_line() {
        let service = ClanService::new(Arc::new(InMemoryStore::new()), Arc::new(EventBus::new()));
        let dir = tempfile::tempdir().unwrap();
        let definition = dir.path().join("game.json");
        std::fs::write(
            &definition,
            r#"{
                "publicId": "g",
                "name": "Game",
                "membershipLevels": {"member": 1, "elder": 2, "leader": 3},
                "minLevelToAcceptApplication": 2,
                "minLevelToCreateInvitation": 2,
                "minLevelToRemoveMember": 2,
                "minLevelOffsetToRemoveMember": 1,
                "minLevelOffsetToPromoteMember": 1,
                "minLevelOffsetToDemoteMember": 1,
                "maxMembers": 10,
                "maxClansPerPlayer": 1,
                "cooldownAfterDeny": 60,
                "cooldownAfterDelete": 60
            }"#,
        )
        .unwrap();

        let game = run(&service, &["game", "upsert", definition.to_str().unwrap()]).unwrap();
        assert_eq!(game["maxMembershipLevel"], 3);

        run(&service, &["player", "create", "--game", "g", "a", "Alice"]).unwrap();
        run(&service, &["player", "create", "--game", "g", "b", "Bob"]).unwrap();
        run(&service, &["clan", "create", "--game", "g", "--owner", "a", "wolves", "Wolves"]).unwrap();
        run(&service, &["member", "apply", "--game", "g", "--clan", "wolves", "b"]).unwrap();
        run(
            &service,
            &["member", "approve-application", "--game", "g", "--clan", "wolves", "b", "--by", "a"],
        )
        .unwrap();

        let clan = run(&service, &["clan", "get", "--game", "g", "wolves"]).unwrap();
        assert_eq!(clan["members"].as_array().unwrap().len(), 2);
        assert_eq!(clan["owner"], "a");

        let health = run(&service, &["health"]).unwrap();
        assert_eq!(health["status"], "WORKING");
    }

    #[test]
    fn rejects_metadata_that_is_not_an_object() {
        assert!(parse_metadata(Some("[1, 2]".into())).is_err());
        assert_eq!(
            parse_metadata(Some(r#"{"tag": "x"}"#.into())).unwrap()["tag"],
            "x"
        );
    }
}
