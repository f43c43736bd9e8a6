use clan_core::{EntityKind, PublicId};
use tracing::info;

use super::{ClanService, not_found, require_game};
use crate::error::Result;
use crate::events::HookEventKind;
use crate::repository::{EntityStore, Hook, Table};

impl<S: EntityStore> ClanService<S> {
    /// Registers `url` to receive every `kind` event of the game.
    pub fn register_hook(
        &self,
        game: &PublicId,
        public_id: PublicId,
        kind: HookEventKind,
        url: String,
    ) -> Result<Hook> {
        let hook = self.store.transaction(|tx| -> Result<Hook> {
            let game = require_game(tx, game)?;
            let hook = Hook {
                id: tx.next_id(Table::Hooks)?,
                game_id: game.id,
                public_id,
                event_kind: kind,
                url,
            };
            tx.insert_hook(&hook)?;
            Ok(hook)
        })?;

        info!("Hook {} registered for {} in game {}", hook.public_id, kind, game);
        Ok(hook)
    }

    pub fn remove_hook(&self, game: &PublicId, public_id: &PublicId) -> Result<()> {
        self.store.transaction(|tx| -> Result<()> {
            let game = require_game(tx, game)?;
            if !tx.delete_hook(game.id, public_id)? {
                return Err(not_found(EntityKind::Hook, public_id).into());
            }
            Ok(())
        })?;

        info!("Hook {} removed from game {}", public_id, game);
        Ok(())
    }

    /// Hooks of the game, optionally only those for one event kind.
    pub fn list_hooks(&self, game: &PublicId, kind: Option<HookEventKind>) -> Result<Vec<Hook>> {
        self.store.transaction(|tx| -> Result<Vec<Hook>> {
            let game = require_game(tx, game)?;
            Ok(tx.hooks(game.id, kind)?)
        })
    }
}
