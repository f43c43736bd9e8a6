//! Topic-based event bus implementation.

use std::sync::Arc;

use clan_core::PublicId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use super::kinds::HookEventKind;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Game definition changes
    Game,
    /// Player records
    Player,
    /// Clan records and ownership
    Clan,
    /// Applications, invitations, rank changes and removals
    Membership,
}

/// A committed change ready for webhook dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEvent {
    pub game: PublicId,
    pub kind: HookEventKind,
    pub payload: Value,
}

impl HookEvent {
    pub fn topic(&self) -> Topic {
        self.kind.topic()
    }
}

struct Channels {
    game: broadcast::Sender<HookEvent>,
    player: broadcast::Sender<HookEvent>,
    clan: broadcast::Sender<HookEvent>,
    membership: broadcast::Sender<HookEvent>,
    /// Receives every event regardless of topic.
    all: broadcast::Sender<HookEvent>,
}

impl Channels {
    fn topic(&self, topic: Topic) -> &broadcast::Sender<HookEvent> {
        match topic {
            Topic::Game => &self.game,
            Topic::Player => &self.player,
            Topic::Clan => &self.clan,
            Topic::Membership => &self.membership,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. The hook dispatcher listens to all of them.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                game: broadcast::channel(capacity).0,
                player: broadcast::channel(capacity).0,
                clan: broadcast::channel(capacity).0,
                membership: broadcast::channel(capacity).0,
                all: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its topic and to the firehose
    pub fn publish(&self, event: HookEvent) {
        let topic = event.topic();

        if self.channels.topic(topic).send(event.clone()).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
        if self.channels.all.send(event).is_err() {
            tracing::trace!("No firehose subscribers");
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<HookEvent> {
        self.channels.topic(topic).subscribe()
    }

    /// Subscribe to every topic through a single receiver
    pub fn subscribe_all(&self) -> broadcast::Receiver<HookEvent> {
        self.channels.all.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: HookEventKind) -> HookEvent {
        HookEvent {
            game: PublicId::new("g"),
            kind,
            payload: json!({"gameID": "g"}),
        }
    }

    #[tokio::test]
    async fn topic_subscribers_only_see_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut clans = bus.subscribe(Topic::Clan);
        let mut all = bus.subscribe_all();

        bus.publish(event(HookEventKind::PlayerCreated));
        bus.publish(event(HookEventKind::ClanCreated));

        assert_eq!(clans.recv().await.unwrap().kind, HookEventKind::ClanCreated);
        assert!(clans.try_recv().is_err());
        assert_eq!(all.recv().await.unwrap().kind, HookEventKind::PlayerCreated);
        assert_eq!(all.recv().await.unwrap().kind, HookEventKind::ClanCreated);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        EventBus::new().publish(event(HookEventKind::GameUpdated));
    }
}
