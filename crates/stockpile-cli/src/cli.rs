use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stockpile")]
#[command(about = "Stockpile CLI: manage your inventory session")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL (overrides config and STOCKPILE_URL env var)
    #[arg(short, long, global = true, env = "STOCKPILE_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "STOCKPILE_PROFILE", default_value = "default")]
    pub profile: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Login to a Stockpile server
    Login(LoginArgs),
    /// Logout (notify the server and clear the stored session)
    Logout,
    /// Show the locally stored session
    Whoami,
    /// Check the session against the server
    Status,
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password
    #[arg(long)]
    pub password: Option<String>,
    /// Persist the session across restarts
    #[arg(long)]
    pub remember: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the active profile configuration
    Show,
    /// Set a configuration value
    Set(SetArgs),
}

#[derive(clap::Args)]
pub struct SetArgs {
    /// Config key (valid: server)
    pub key: String,
    /// New value
    pub value: String,
}
