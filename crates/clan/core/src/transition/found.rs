use serde::{Deserialize, Serialize};

use super::{MembershipError, PolicyEnv};
use crate::policy::Metadata;
use crate::state::{Clan, ClanId, ClanState, Membership, Player, PublicId};

/// Caller-supplied fields of a new clan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanCharter {
    pub public_id: PublicId,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default = "default_true")]
    pub allow_application: bool,
    #[serde(default)]
    pub auto_join: bool,
}

fn default_true() -> bool {
    true
}

/// Builds the snapshot of a freshly created clan.
///
/// The founder becomes owner with an approved membership at the top of the
/// ladder and counts against their `maxClansPerPlayer`.
pub fn found_clan(
    id: ClanId,
    charter: ClanCharter,
    mut owner: Player,
    env: &PolicyEnv<'_>,
) -> Result<ClanState, MembershipError> {
    let max_clans = env.policy.rules().max_clans_per_player;
    if owner.membership_count >= max_clans {
        return Err(MembershipError::TooManyClans {
            player: owner.public_id,
            max_clans,
        });
    }

    let clan = Clan {
        id,
        game_id: owner.game_id,
        public_id: charter.public_id,
        name: charter.name,
        owner_id: owner.id,
        membership_count: 1,
        allow_application: charter.allow_application,
        auto_join: charter.auto_join,
        metadata: charter.metadata,
        created_at: env.now,
        updated_at: env.now,
    };

    let level = env.policy.owner_level().rank;
    let mut membership = Membership::request(&clan, owner.id, owner.id, level, None, env.now);
    membership.approve(owner.id, level, env.now);

    owner.membership_count += 1;
    owner.ownership_count += 1;

    let state = ClanState::new(clan)
        .with_player(owner)
        .with_membership(membership);
    state.check_invariants()?;
    Ok(state)
}
