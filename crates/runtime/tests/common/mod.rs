#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use clan_core::{
    ClanCharter, GameDefinition, LevelMap, MembershipRules, Metadata, OwnerDemotion, PublicId,
    Timestamp,
};
use clan_runtime::{
    ClanService, EntityStore, HookEventKind, HookNotifier, InMemoryStore, ManualClock, NewPlayer,
};
use serde_json::{Value, json};

pub const HOUR: Duration = Duration::from_secs(3_600);

/// Notifier that keeps every dispatched event.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(PublicId, HookEventKind, Value)>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<HookEventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, kind, _)| *kind)
            .collect()
    }

    pub fn last(&self, kind: HookEventKind) -> Option<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, k, _)| *k == kind)
            .map(|(_, _, payload)| payload.clone())
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl HookNotifier for RecordingNotifier {
    fn dispatch(&self, game: &PublicId, kind: HookEventKind, payload: Value) {
        self.events
            .lock()
            .unwrap()
            .push((game.clone(), kind, payload));
    }
}

pub fn levels() -> LevelMap {
    match json!({"member": 1, "elder": 2, "coleader": 3, "leader": 4}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn definition(max_members: u32) -> GameDefinition {
    GameDefinition {
        public_id: PublicId::new("game"),
        name: "Test Game".into(),
        membership_levels: levels(),
        rules: MembershipRules {
            min_level_to_accept_application: 3,
            min_level_to_create_invitation: 3,
            min_level_to_remove_member: 3,
            min_level_offset_to_remove_member: 1,
            min_level_offset_to_promote_member: 1,
            min_level_offset_to_demote_member: 1,
            max_members,
            max_clans_per_player: 2,
            cooldown_after_deny: 24 * HOUR,
            cooldown_after_delete: HOUR,
            owner_demotion: OwnerDemotion::Penultimate,
        },
        metadata: Metadata::new(),
    }
}

pub fn charter(public_id: &str) -> ClanCharter {
    ClanCharter {
        public_id: PublicId::new(public_id),
        name: public_id.to_uppercase(),
        metadata: Metadata::new(),
        allow_application: true,
        auto_join: false,
    }
}

pub fn id(value: &str) -> PublicId {
    PublicId::new(value)
}

pub struct Fixture<S> {
    pub service: ClanService<S>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub game: PublicId,
    pub clan: PublicId,
}

/// Game with players `a`..`e`; `a` owns clan `wolves`.
pub fn fixture_with<S: EntityStore>(store: S, max_members: u32) -> Fixture<S> {
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
    let service = ClanService::new(Arc::new(store), notifier.clone()).with_clock(clock.clone());

    let game = service.upsert_game(definition(max_members)).unwrap();
    for name in ["a", "b", "c", "d", "e"] {
        service
            .create_player(
                &game.public_id,
                NewPlayer {
                    public_id: id(name),
                    name: name.to_uppercase(),
                    metadata: Metadata::new(),
                },
            )
            .unwrap();
    }
    let clan = service
        .create_clan(&game.public_id, &id("a"), charter("wolves"))
        .unwrap();
    notifier.clear();

    Fixture {
        service,
        notifier,
        clock,
        game: game.public_id,
        clan: clan.public_id,
    }
}

pub fn fixture(max_members: u32) -> Fixture<InMemoryStore> {
    fixture_with(InMemoryStore::new(), max_members)
}

impl<S: EntityStore> Fixture<S> {
    /// Active rank of `player` in the fixture clan.
    pub fn rank(&self, player: &str) -> Option<i64> {
        self.service
            .get_clan(&self.game, &self.clan)
            .unwrap()
            .members
            .into_iter()
            .find(|entry| entry.player.as_str() == player)
            .map(|entry| entry.level)
    }

    /// Applies and gets approved by the owner.
    pub fn join(&self, player: &str) {
        self.service
            .apply(&self.game, &self.clan, &id(player), None)
            .unwrap();
        self.service
            .approve_application(&self.game, &self.clan, &id(player), &id("a"))
            .unwrap();
    }
}
