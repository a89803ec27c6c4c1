use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hoard",
    about = "Hoard: content-addressable storage with cascading removal",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store directory (overrides `base_path` from the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML file with store settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "md5")]
    pub algorithm: Algorithm,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Algorithm {
    Md5,
    Blake3,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file (or `-` for stdin) and print its identifier
    Store(StoreArgs),
    /// Store a file as a dependent of an existing object
    Link(LinkArgs),
    /// Write an object's bytes to stdout
    Cat(IdArgs),
    /// Report whether an object is stored
    Exists(IdArgs),
    /// Print the on-disk location of an object
    Path(IdArgs),
    /// List the dependents registered under an object
    Deps(IdArgs),
    /// Remove an object and its dependents
    Rm(RmArgs),
    /// Re-hash stored objects and compare against their identifiers
    Verify(VerifyArgs),
    /// Show object count and total size
    Stats,
    /// Store every regular file under a directory
    Import(ImportArgs),
}

#[derive(Args)]
pub struct StoreArgs {
    /// File to store; `-` reads stdin
    pub input: PathBuf,
}

#[derive(Args)]
pub struct LinkArgs {
    /// Identifier of the owning object
    pub parent: String,
    /// File to store; `-` reads stdin
    pub input: PathBuf,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct RmArgs {
    pub id: String,
    /// Follow dependents of dependents
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Object to check; every object when omitted
    pub id: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    pub dir: PathBuf,
    /// Register every imported file as a dependent of this object
    #[arg(long)]
    pub parent: Option<String>,
    /// Delete each source file after it has been stored
    #[arg(long = "move")]
    pub remove_source: bool,
}
