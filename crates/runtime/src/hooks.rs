//! Hook notification contract and webhook URL templates.

use clan_core::PublicId;
use serde_json::Value;

use crate::events::{EventBus, HookEvent, HookEventKind};

/// Receives committed changes for webhook delivery.
///
/// Called after the store transaction committed. Implementations must not
/// block and must not fail the caller: delivery problems are theirs to log.
pub trait HookNotifier: Send + Sync {
    fn dispatch(&self, game: &PublicId, kind: HookEventKind, payload: Value);
}

impl HookNotifier for EventBus {
    fn dispatch(&self, game: &PublicId, kind: HookEventKind, payload: Value) {
        self.publish(HookEvent {
            game: game.clone(),
            kind,
            payload,
        });
    }
}

/// Fills `{{path}}` placeholders of a hook URL from the event payload.
///
/// Paths use dots for nested fields (`{{clan.publicID}}`). Strings are
/// inserted as-is, other values in their JSON form; missing fields become
/// empty. Unterminated placeholders are copied literally.
pub fn render_url(template: &str, payload: &Value) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rendered.push_str(&rest[start..]);
            return rendered;
        };

        let path = after[..end].trim();
        match lookup(payload, path) {
            Some(Value::String(text)) => rendered.push_str(text),
            Some(Value::Null) | None => {}
            Some(other) => rendered.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }

    rendered.push_str(rest);
    rendered
}

fn lookup<'v>(payload: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(payload, |value, key| value.get(key))
}
