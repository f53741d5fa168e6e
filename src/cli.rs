// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines one subcommand per lifecycle phase plus init/login/exec/status.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dokimi")]
#[command(about = "Remote-provisioning lifecycle driver for test infrastructure")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON lines output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new dokimi.yml configuration file
    Init {
        /// Hostname to pre-fill in the instance section
        #[arg(long)]
        host: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Wait until the configured instance accepts connections
    Create,

    /// Install and run the provisioner on the instance
    Converge,

    /// Prepare the test-runner agent on the instance
    Setup,

    /// Sync test content to the instance and run the tests
    Verify,

    /// Release the instance
    Destroy,

    /// Run create, converge, setup, verify, and destroy in order
    Test,

    /// Open an interactive login session on the instance
    Login,

    /// Run a single command on the instance
    Exec {
        /// Command to run remotely
        command: String,
    },

    /// Show the configured instance and its login command
    Status,
}
