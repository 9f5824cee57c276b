use chatsync_types::EntityKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chatsync")]
#[command(about = "Inspect and manage chat entities stored behind the chatsync API")]
pub struct Cli {
    /// JSON config file (see `ApiConfig`)
    #[arg(short, long, env = "CHATSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// API base URL, overrides the config file
    #[arg(long, env = "CHATSYNC_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token, overrides the config file
    #[arg(long, env = "CHATSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List entities (or folders) under a folder
    List {
        kind: KindArg,
        bucket: String,
        /// Folder path below the bucket
        folder: Vec<String>,
        /// Only direct children
        #[arg(long)]
        flat: bool,
        /// List folders instead of entities
        #[arg(long)]
        folders: bool,
    },
    /// Print an entity as JSON
    Get { kind: KindArg, key: String },
    /// Delete an entity
    Delete { kind: KindArg, key: String },
    /// Move an entity to another folder of its bucket
    Move {
        kind: KindArg,
        key: String,
        /// New folder path; empty for the bucket root
        to: Vec<String>,
    },
    /// Upload a file into the files namespace
    Upload {
        key: String,
        path: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Create a publication request
    Publish {
        #[arg(long)]
        name: String,
        #[arg(long)]
        target_folder: String,
        #[arg(long, value_enum, default_value = "prompt")]
        kind: KindArg,
        /// SOURCE=TARGET pair published with ADD
        #[arg(long = "add", value_name = "SOURCE=TARGET")]
        add: Vec<String>,
        /// SOURCE=TARGET pair published with ADD_IF_ABSENT
        #[arg(long = "add-if-absent", value_name = "SOURCE=TARGET")]
        add_if_absent: Vec<String>,
        /// TARGET removed with DELETE
        #[arg(long = "delete", value_name = "TARGET")]
        delete: Vec<String>,
        /// Show the effect against the target bucket without submitting
        #[arg(long)]
        dry_run: bool,
    },
    /// Approve a pending publication
    Approve { url: String },
    /// Reject a pending publication
    Reject {
        url: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// List publications awaiting review in a bucket
    Pending { bucket: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Conversation,
    Prompt,
    Application,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Conversation => EntityKind::Conversation,
            KindArg::Prompt => EntityKind::Prompt,
            KindArg::Application => EntityKind::Application,
        }
    }
}
