//! Command-line definitions (clap derive).

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "rainfly",
    version,
    about = "Manage a RainMaker-style smart-home fleet: nodes, schedules, scenes, claiming",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use.
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Cloud API base URL (overrides the profile).
    #[arg(long, global = true, env = "RAINFLY_BASE_URL")]
    pub base_url: Option<String>,

    /// Access token (overrides the profile).
    #[arg(long, global = true, env = "RAINFLY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip TLS verification (development backends only).
    #[arg(short = 'k', long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Local snapshot-store directory.
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Emit JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect the node fleet.
    Nodes(NodesArgs),
    /// Manage schedules across the fleet.
    Schedules(SchedulesArgs),
    /// Manage and activate scenes.
    Scenes(ScenesArgs),
    /// Claim an unclaimed device on the local network.
    Claim(ClaimArgs),
    /// Talk to a device directly over the LAN.
    Local(LocalArgs),
    /// Share nodes with other users.
    Sharing(SharingArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

// ── Nodes ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// List all nodes with connectivity and capability summary.
    List,
    /// Show one node in detail.
    Show { node_id: String },
    /// List node groups.
    Groups,
}

// ── Schedules ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SchedulesArgs {
    #[command(subcommand)]
    pub command: SchedulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SchedulesCommand {
    /// List schedules merged across the fleet.
    List {
        /// Read the locally stored snapshot instead of the cloud.
        #[arg(long)]
        cached: bool,
    },
    /// Create (or edit) a schedule from param selections.
    Save(SaveScheduleArgs),
    /// Enable a schedule.
    Enable { key: String },
    /// Disable a schedule.
    Disable { key: String },
    /// Delete a schedule, or only some of its nodes.
    Delete {
        key: String,
        /// Remove only these nodes from the schedule.
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct SaveScheduleArgs {
    /// Schedule name.
    #[arg(long)]
    pub name: String,

    /// Trigger time of day, HH:MM (24h).
    #[arg(long)]
    pub time: String,

    /// Repeat days, comma-separated (mon,tue,...); omit for once.
    #[arg(long, value_delimiter = ',')]
    pub days: Vec<String>,

    /// Edit an existing schedule id instead of creating one.
    #[arg(long)]
    pub id: Option<String>,

    /// Param selections: node/device/param=value (JSON value).
    #[arg(long = "set", required = true)]
    pub selections: Vec<String>,
}

// ── Scenes ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScenesArgs {
    #[command(subcommand)]
    pub command: ScenesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScenesCommand {
    /// List scenes merged across the fleet.
    List {
        /// Read the locally stored snapshot instead of the cloud.
        #[arg(long)]
        cached: bool,
    },
    /// Create (or edit) a scene from param selections.
    Save(SaveSceneArgs),
    /// Apply a scene on its devices.
    Activate { key: String },
    /// Delete a scene, or only some of its nodes.
    Delete {
        key: String,
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct SaveSceneArgs {
    /// Scene name.
    #[arg(long)]
    pub name: String,

    /// Free-text description.
    #[arg(long, default_value = "")]
    pub info: String,

    /// Edit an existing scene id instead of creating one.
    #[arg(long)]
    pub id: Option<String>,

    /// Param selections: node/device/param=value (JSON value).
    #[arg(long = "set", required = true)]
    pub selections: Vec<String>,
}

// ── Claiming / local control ────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClaimArgs {
    /// Device host on the local network (e.g. 192.168.4.1:80).
    #[arg(long)]
    pub host: String,
}

#[derive(Debug, Args)]
pub struct LocalArgs {
    #[command(subcommand)]
    pub command: LocalCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocalCommand {
    /// Fetch all property values from a LAN device.
    Info {
        #[arg(long)]
        host: String,
    },
    /// Write a property payload to a LAN device.
    Set {
        #[arg(long)]
        host: String,
        /// JSON payload, e.g. '{"Light":{"Power":true}}'.
        payload: String,
    },
}

// ── Sharing ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SharingArgs {
    #[command(subcommand)]
    pub command: SharingCommand,
}

#[derive(Debug, Subcommand)]
pub enum SharingCommand {
    /// Share nodes with another user.
    Add {
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,
        #[arg(long)]
        user: String,
    },
    /// List sharing requests.
    Requests {
        /// Requests issued by this user instead of received ones.
        #[arg(long)]
        primary: bool,
    },
    /// Accept or decline a pending request.
    Respond {
        request_id: String,
        #[arg(long, conflicts_with = "decline")]
        accept: bool,
        #[arg(long)]
        decline: bool,
    },
    /// Revoke a user's access to a node.
    Revoke {
        #[arg(long)]
        node: String,
        #[arg(long)]
        user: String,
    },
}

// ── Completions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    pub shell: clap_complete::Shell,
}
