use clan_core::{Game, GameDefinition, GameId, PublicId};
use tracing::info;

use super::{ClanService, Notice, require_game};
use crate::error::Result;
use crate::events::HookEventKind;
use crate::events::payload::game_snapshot;
use crate::repository::{EntityStore, Table};

impl<S: EntityStore> ClanService<S> {
    /// Creates the game, or redefines it when the public id is already known.
    ///
    /// The derived min/max membership levels are recomputed either way.
    pub fn upsert_game(&self, definition: GameDefinition) -> Result<Game> {
        let now = self.clock.now();
        let (game, existed) = self.store.transaction(|tx| -> Result<(Game, bool)> {
            match tx.game_by_public_id(&definition.public_id)? {
                Some(mut game) => {
                    game.redefine(definition, now)?;
                    tx.update_game(&game)?;
                    Ok((game, true))
                }
                None => {
                    let id = GameId(tx.next_id(Table::Games)?);
                    let game = Game::new(id, definition, now)?;
                    tx.insert_game(&game)?;
                    Ok((game, false))
                }
            }
        })?;

        if existed {
            info!("Game {} updated", game.public_id);
            self.publish(
                &game.public_id,
                vec![Notice::new(HookEventKind::GameUpdated, game_snapshot(&game))],
            );
        } else {
            info!("Game {} created", game.public_id);
        }
        Ok(game)
    }

    /// Redefines an existing game.
    pub fn update_game(&self, public_id: &PublicId, mut definition: GameDefinition) -> Result<Game> {
        definition.public_id = public_id.clone();
        let now = self.clock.now();
        let game = self.store.transaction(|tx| -> Result<Game> {
            let mut game = require_game(tx, public_id)?;
            game.redefine(definition, now)?;
            tx.update_game(&game)?;
            Ok(game)
        })?;

        info!("Game {} updated", game.public_id);
        self.publish(
            &game.public_id,
            vec![Notice::new(HookEventKind::GameUpdated, game_snapshot(&game))],
        );
        Ok(game)
    }

    pub fn get_game(&self, public_id: &PublicId) -> Result<Game> {
        self.store.transaction(|tx| require_game(tx, public_id))
    }

    pub fn list_games(&self) -> Result<Vec<Game>> {
        Ok(self.store.transaction(|tx| tx.list_games())?)
    }
}
