//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clan_runtime::HookEventKind;

/// clanctl - manage games, players, clans and memberships
#[derive(Parser, Debug)]
#[command(name = "clanctl")]
#[command(about = "Clan membership engine command line")]
pub struct Cli {
    /// SQLite database file (default: platform data directory)
    #[arg(long, global = true, env = "CLAN_DATABASE_PATH")]
    pub database: Option<PathBuf>,

    /// Use a throwaway in-memory store
    #[arg(long, global = true, conflicts_with = "database")]
    pub in_memory: bool,

    /// Do not post webhooks for this invocation
    #[arg(long, global = true)]
    pub no_hooks: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the store answers
    Health,

    /// Games and their membership rules
    #[command(subcommand)]
    Game(GameCommand),

    /// Players of a game
    #[command(subcommand)]
    Player(PlayerCommand),

    /// Clans of a game
    #[command(subcommand)]
    Clan(ClanCommand),

    /// Membership transitions
    #[command(subcommand)]
    Member(MemberCommand),

    /// Webhook registrations
    #[command(subcommand)]
    Hook(HookCommand),
}

#[derive(Subcommand, Debug)]
pub enum GameCommand {
    /// Create or redefine a game from a JSON definition file
    Upsert {
        /// Path to the definition, `-` for stdin
        file: PathBuf,
    },
    Get {
        game: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum PlayerCommand {
    Create {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        player: String,
        name: String,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    Update {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        player: String,
        name: String,
        #[arg(long)]
        metadata: Option<String>,
    },
    Get {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        player: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClanCommand {
    Create {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        #[arg(long)]
        owner: String,
        clan: String,
        name: String,
        #[arg(long)]
        metadata: Option<String>,
        /// Refuse applications; members join by invitation only
        #[arg(long)]
        closed: bool,
        #[arg(long)]
        auto_join: bool,
    },
    /// Change name, metadata or admission flags (owner only)
    Update {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        #[arg(long)]
        owner: String,
        clan: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        metadata: Option<String>,
        #[arg(long)]
        allow_application: Option<bool>,
        #[arg(long)]
        auto_join: Option<bool>,
    },
    Get {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        clan: String,
    },
    List {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
    },
    Search {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        term: String,
    },
}

/// Game and clan every membership command works on.
#[derive(Args, Debug)]
pub struct ClanRef {
    #[arg(long, env = "CLAN_GAME")]
    pub game: String,
    #[arg(long)]
    pub clan: String,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    Apply {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        message: Option<String>,
    },
    Invite {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        message: Option<String>,
    },
    ApproveApplication {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        by: String,
    },
    DenyApplication {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        by: String,
    },
    ApproveInvitation {
        #[command(flatten)]
        at: ClanRef,
        player: String,
    },
    DenyInvitation {
        #[command(flatten)]
        at: ClanRef,
        player: String,
    },
    Promote {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        by: String,
    },
    Demote {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        by: String,
    },
    Delete {
        #[command(flatten)]
        at: ClanRef,
        player: String,
        #[arg(long)]
        by: String,
    },
    Leave {
        #[command(flatten)]
        at: ClanRef,
        player: String,
    },
    /// Hand the clan to another member
    Transfer {
        #[command(flatten)]
        at: ClanRef,
        #[arg(long)]
        owner: String,
        new_owner: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HookCommand {
    Register {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        hook: String,
        /// Event kind, e.g. `application_created`
        kind: HookEventKind,
        /// Target URL; `{{clan.publicID}}` style placeholders are filled from the payload
        url: String,
    },
    Remove {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        hook: String,
    },
    List {
        #[arg(long, env = "CLAN_GAME")]
        game: String,
        #[arg(long)]
        kind: Option<HookEventKind>,
    },
}
