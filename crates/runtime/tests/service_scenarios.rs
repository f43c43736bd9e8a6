mod common;

use clan_core::{ClanError, CooldownKind, EntityKind, MembershipError, Metadata};
use clan_runtime::{ClanUpdate, HookEventKind, NewPlayer, RepositoryError, ServiceError};
use common::{HOUR, charter, fixture, id};

fn membership_error(error: &ServiceError) -> &MembershipError {
    error
        .membership_error()
        .unwrap_or_else(|| panic!("expected a rule violation, got {error}"))
}

#[test]
fn apply_approve_promote_transfer() {
    let f = fixture(3);
    assert_eq!(f.rank("a"), Some(4));

    f.service.apply(&f.game, &f.clan, &id("b"), None).unwrap();
    let clan = f.service.get_clan(&f.game, &f.clan).unwrap();
    assert_eq!(clan.pending_applications.len(), 1);
    assert_eq!(clan.pending_applications[0].player, id("b"));

    f.service
        .approve_application(&f.game, &f.clan, &id("b"), &id("a"))
        .unwrap();
    assert_eq!(f.rank("b"), Some(1));

    f.service
        .promote(&f.game, &f.clan, &id("b"), &id("a"))
        .unwrap();
    assert_eq!(f.rank("b"), Some(2));

    f.service
        .transfer_ownership(&f.game, &f.clan, &id("a"), &id("b"))
        .unwrap();
    let clan = f.service.get_clan(&f.game, &f.clan).unwrap();
    assert_eq!(clan.owner, id("b"));
    assert_eq!(f.rank("b"), Some(4));
    assert_eq!(f.rank("a"), Some(3));
    assert_eq!(clan.members[0].level_name.as_deref(), Some("leader"));

    assert_eq!(
        f.notifier.kinds(),
        vec![
            HookEventKind::ApplicationCreated,
            HookEventKind::ApplicationApproved,
            HookEventKind::MemberPromoted,
            HookEventKind::OwnershipTransferred,
        ]
    );
    let transfer = f.notifier.last(HookEventKind::OwnershipTransferred).unwrap();
    assert_eq!(transfer["previousOwner"]["publicID"], "a");
    assert_eq!(transfer["newOwner"]["publicID"], "b");
    assert_eq!(transfer["isDeleted"], false);
}

#[test]
fn denied_player_waits_out_the_cooldown() {
    let f = fixture(3);
    f.service.apply(&f.game, &f.clan, &id("c"), None).unwrap();
    f.service
        .deny_application(&f.game, &f.clan, &id("c"), &id("a"))
        .unwrap();

    f.clock.advance(HOUR);
    let err = f
        .service
        .apply(&f.game, &f.clan, &id("c"), None)
        .unwrap_err();
    match membership_error(&err) {
        MembershipError::CooldownActive {
            kind, remaining, ..
        } => {
            assert_eq!(*kind, CooldownKind::Deny);
            assert_eq!(*remaining, 23 * HOUR);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.error_code(), "MEMBERSHIP_COOLDOWN_ACTIVE");

    f.clock.advance(24 * HOUR);
    f.service.apply(&f.game, &f.clan, &id("c"), None).unwrap();
}

#[test]
fn full_clan_rejects_new_applications() {
    let f = fixture(3);
    f.join("b");
    f.join("c");

    let err = f
        .service
        .apply(&f.game, &f.clan, &id("d"), None)
        .unwrap_err();
    assert!(matches!(
        membership_error(&err),
        MembershipError::ClanFull { max_members: 3, .. }
    ));
    assert!(f.service.get_clan(&f.game, &f.clan).unwrap().pending_applications.is_empty());
}

#[test]
fn rejected_action_leaves_store_untouched() {
    let f = fixture(5);
    f.join("b");
    f.notifier.clear();

    let err = f
        .service
        .promote(&f.game, &f.clan, &id("a"), &id("b"))
        .unwrap_err();
    assert!(err.membership_error().is_some());
    assert_eq!(f.rank("a"), Some(4));
    assert_eq!(f.rank("b"), Some(1));
    assert!(f.notifier.kinds().is_empty());
}

#[test]
fn invitation_round_trip_carries_message() {
    let f = fixture(5);
    f.service
        .invite(&f.game, &f.clan, &id("b"), &id("a"), Some("join us".into()))
        .unwrap();
    let invitation = f.notifier.last(HookEventKind::InvitationCreated).unwrap();
    assert_eq!(invitation["message"], "join us");
    assert_eq!(invitation["requestor"]["publicID"], "a");
    assert!(invitation.get("creator").is_none());

    f.service
        .approve_invitation(&f.game, &f.clan, &id("b"))
        .unwrap();
    assert_eq!(f.rank("b"), Some(1));
    let approved = f.notifier.last(HookEventKind::InvitationApproved).unwrap();
    assert_eq!(approved["creator"]["publicID"], "a");
    assert_eq!(approved["player"]["membershipLevel"], "member");
    assert_eq!(approved["gameID"], "game");

    let player = f.service.get_player(&f.game, &id("b")).unwrap();
    assert_eq!(player.memberships.len(), 1);
    assert_eq!(player.memberships[0].level, "member");
    assert!(!player.memberships[0].owner);
}

#[test]
fn auto_join_notifies_creation_and_approval() {
    let f = fixture(5);
    f.service
        .update_clan(
            &f.game,
            &f.clan,
            &id("a"),
            ClanUpdate {
                auto_join: Some(true),
                ..ClanUpdate::default()
            },
        )
        .unwrap();
    f.notifier.clear();

    f.service.apply(&f.game, &f.clan, &id("b"), None).unwrap();
    assert_eq!(f.rank("b"), Some(1));
    assert_eq!(
        f.notifier.kinds(),
        vec![
            HookEventKind::ApplicationCreated,
            HookEventKind::ApplicationApproved
        ]
    );
    let approved = f.notifier.last(HookEventKind::ApplicationApproved).unwrap();
    assert_eq!(approved["requestor"]["publicID"], "a");
}

#[test]
fn only_owner_updates_clan() {
    let f = fixture(5);
    f.join("b");

    let err = f
        .service
        .update_clan(
            &f.game,
            &f.clan,
            &id("b"),
            ClanUpdate {
                name: Some("Sheep".into()),
                ..ClanUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        membership_error(&err),
        MembershipError::ActorNotPermitted { .. }
    ));

    let clan = f
        .service
        .update_clan(
            &f.game,
            &f.clan,
            &id("a"),
            ClanUpdate {
                name: Some("Sheep".into()),
                allow_application: Some(false),
                ..ClanUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(clan.name, "Sheep");
    assert!(!clan.allow_application);

    let err = f
        .service
        .apply(&f.game, &f.clan, &id("c"), None)
        .unwrap_err();
    assert!(matches!(
        membership_error(&err),
        MembershipError::ApplicationsClosed { .. }
    ));
}

#[test]
fn owner_leaving_hands_clan_to_strongest_member() {
    let f = fixture(5);
    f.join("b");
    f.join("c");
    f.service
        .promote(&f.game, &f.clan, &id("c"), &id("a"))
        .unwrap();
    f.notifier.clear();

    f.service.leave(&f.game, &f.clan, &id("a")).unwrap();
    let clan = f.service.get_clan(&f.game, &f.clan).unwrap();
    assert_eq!(clan.owner, id("c"));
    assert_eq!(f.rank("c"), Some(4));
    assert_eq!(f.rank("a"), None);

    assert_eq!(f.notifier.kinds(), vec![HookEventKind::ClanLeft]);
    let left = f.notifier.last(HookEventKind::ClanLeft).unwrap();
    assert_eq!(left["previousOwner"]["publicID"], "a");
    assert_eq!(left["newOwner"]["publicID"], "c");
    assert_eq!(left["isDeleted"], false);
}

#[test]
fn last_owner_leaving_dissolves_clan() {
    let f = fixture(5);
    f.service.leave(&f.game, &f.clan, &id("a")).unwrap();

    let err = f.service.get_clan(&f.game, &f.clan).unwrap_err();
    assert!(matches!(
        membership_error(&err),
        MembershipError::NotFound {
            entity: EntityKind::Clan,
            ..
        }
    ));
    let left = f.notifier.last(HookEventKind::ClanLeft).unwrap();
    assert_eq!(left["isDeleted"], true);
    assert!(left["newOwner"].is_null());
    assert!(f.service.get_player(&f.game, &id("a")).unwrap().memberships.is_empty());
}

#[test]
fn removed_member_waits_out_delete_cooldown() {
    let f = fixture(5);
    f.join("b");
    f.service
        .delete_member(&f.game, &f.clan, &id("b"), &id("a"))
        .unwrap();
    assert_eq!(f.rank("b"), None);
    assert!(f.notifier.last(HookEventKind::MemberDeleted).is_some());

    let err = f
        .service
        .apply(&f.game, &f.clan, &id("b"), None)
        .unwrap_err();
    assert!(matches!(
        membership_error(&err),
        MembershipError::CooldownActive {
            kind: CooldownKind::Delete,
            ..
        }
    ));

    f.clock.advance(HOUR);
    f.service.apply(&f.game, &f.clan, &id("b"), None).unwrap();
}

#[test]
fn player_limit_spans_clans() {
    let f = fixture(5);
    f.service
        .create_clan(&f.game, &id("b"), charter("bears"))
        .unwrap();
    f.service
        .create_clan(&f.game, &id("c"), charter("crows"))
        .unwrap();
    f.join("d");

    f.service
        .apply(&f.game, &id("bears"), &id("d"), None)
        .unwrap();
    f.service
        .approve_application(&f.game, &id("bears"), &id("d"), &id("b"))
        .unwrap();

    let err = f
        .service
        .apply(&f.game, &id("crows"), &id("d"), None)
        .unwrap_err();
    assert!(matches!(
        membership_error(&err),
        MembershipError::TooManyClans { max_clans: 2, .. }
    ));
}

#[test]
fn search_matches_name_ignoring_case() {
    let f = fixture(5);
    f.service
        .create_clan(&f.game, &id("b"), charter("werewolves"))
        .unwrap();
    f.service
        .create_clan(&f.game, &id("c"), charter("bears"))
        .unwrap();

    let mut found: Vec<String> = f
        .service
        .search_clans(&f.game, "wolves")
        .unwrap()
        .into_iter()
        .map(|clan| clan.public_id.to_string())
        .collect();
    found.sort();
    assert_eq!(found, vec!["werewolves", "wolves"]);
    assert_eq!(f.service.list_clans(&f.game).unwrap().len(), 3);
}

#[test]
fn duplicate_player_id_conflicts() {
    let f = fixture(5);
    let err = f
        .service
        .create_player(
            &f.game,
            NewPlayer {
                public_id: id("a"),
                name: "Again".into(),
                metadata: Metadata::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repository(RepositoryError::Conflict {
            entity: EntityKind::Player,
            ..
        })
    ));
    assert_eq!(err.error_code(), "STORE_CONFLICT");
}

#[test]
fn hooks_register_list_remove() {
    let f = fixture(5);
    f.service
        .register_hook(
            &f.game,
            id("h1"),
            HookEventKind::MemberLeft,
            "http://localhost/{{clan.publicID}}".into(),
        )
        .unwrap();
    f.service
        .register_hook(
            &f.game,
            id("h2"),
            HookEventKind::ClanCreated,
            "http://localhost/created".into(),
        )
        .unwrap();

    assert_eq!(f.service.list_hooks(&f.game, None).unwrap().len(), 2);
    let left = f
        .service
        .list_hooks(&f.game, Some(HookEventKind::MemberLeft))
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].public_id, id("h1"));

    f.service.remove_hook(&f.game, &id("h1")).unwrap();
    assert!(f.service.remove_hook(&f.game, &id("h1")).is_err());
    assert_eq!(f.service.list_hooks(&f.game, None).unwrap().len(), 1);
}

#[test]
fn health_check_reports_working() {
    let f = fixture(5);
    assert_eq!(f.service.health_check().unwrap(), "WORKING");
}
