use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use ideavault_core::VERSION;

/// IdeaVault - encrypted idea lists protected by a portable key file
#[derive(Parser)]
#[command(name = "ideavault")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use this key file instead of the remembered one
    #[arg(short, long, global = true, env = "IDEAVAULT_KEY_FILE")]
    pub key_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_input: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a config file and create your first key
    Init(InitArgs),

    /// Manage the key file
    #[command(subcommand)]
    Key(KeyCommands),

    /// Work with encrypted idea lists
    #[command(subcommand)]
    List(ListCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Directory for new key files
    #[arg(long, value_name = "DIR")]
    pub key_dir: Option<String>,

    /// Directory for encrypted list files
    #[arg(long, value_name = "DIR")]
    pub list_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate a new key file and make it the active key
    New {
        /// Overwrite the file given by --key-file if it exists
        #[arg(long)]
        force: bool,
    },

    /// Show details about the active key
    Show,

    /// Print the active key's fingerprint
    Fingerprint,

    /// Forget the remembered key file (the file itself is kept)
    Forget,
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// Create an empty list
    New(ListNameArgs),

    /// Show the ideas in a list
    Show(ListShowArgs),

    /// Append ideas to a list
    Add(ListAddArgs),

    /// Remove an idea by its position
    Remove(ListRemoveArgs),

    /// Rename a list
    Rename(ListRenameArgs),
}

/// Arguments naming a single list
#[derive(Args)]
pub struct ListNameArgs {
    /// List name
    #[arg(value_name = "NAME")]
    pub name: String,
}

/// Arguments for `list show`
#[derive(Args)]
pub struct ListShowArgs {
    /// List name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `list add`
#[derive(Args)]
pub struct ListAddArgs {
    /// List name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Ideas to append
    #[arg(value_name = "IDEA", required = true)]
    pub ideas: Vec<String>,
}

/// Arguments for `list remove`
#[derive(Args)]
pub struct ListRemoveArgs {
    /// List name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Position of the idea (1-based, as shown by `list show`)
    #[arg(value_name = "POSITION")]
    pub position: usize,
}

/// Arguments for `list rename`
#[derive(Args)]
pub struct ListRenameArgs {
    /// Current list name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// New list name
    #[arg(value_name = "NEW_NAME")]
    pub new_name: String,
}
