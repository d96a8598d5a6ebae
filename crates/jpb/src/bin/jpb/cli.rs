//! jpb cli interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    /// Write documents to --output-dir instead of publishing them, log at debug level
    #[clap(long, global(true))]
    pub debug: bool,

    /// Directory documents are written to in debug mode
    #[clap(long, global(true), default_value = ".")]
    pub output_dir: PathBuf,

    #[clap(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser, Debug)]
pub struct ServerArgs {
    /// Credentials file (yaml)
    #[clap(long, global(true), env = "JPB_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Server url, overrides the credentials file
    #[clap(long, global(true), env = "JPB_SERVER_URL")]
    pub server_url: Option<String>,

    #[clap(long, global(true), env = "JPB_USERNAME")]
    pub username: Option<String>,

    #[clap(long, global(true), env = "JPB_PASSWORD", hide_env_values(true))]
    pub password: Option<String>,

    /// Fail jobs using plugins the server does not have
    #[clap(long, global(true))]
    pub strict_capabilities: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a project, job or view (everything when no name is given)
    Bootstrap {
        /// Definition file or directory
        path: PathBuf,
        name: Option<String>,
    },

    /// Publish one instance of a project per open pull request
    ///
    /// Instances of closed pull requests are deleted.
    PullRequest(PullRequestCommand),

    /// Write the configuration of a job as the server has it to <output-dir>/<job>.xml
    Dump { job: String },

    /// List the available attributes
    Attributes {
        /// Include attributes not announced to users
        #[clap(long)]
        all: bool,
    },

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct PullRequestCommand {
    /// Definition file or directory
    pub path: PathBuf,

    /// Project name
    pub name: String,

    /// Use these pull request numbers instead of asking GitHub
    #[clap(long = "pr")]
    pub numbers: Vec<u64>,

    /// Repository (owner/name) to ask, overrides the project's `pull_request.github`
    #[clap(long)]
    pub github: Option<String>,

    #[clap(long, env = "JPB_GITHUB_TOKEN", hide_env_values(true))]
    pub github_token: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Definitions as loaded
    Definitions { path: PathBuf },
    /// Definitions after template and parameter resolution
    Resolved { path: PathBuf },
}
