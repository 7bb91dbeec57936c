use std::path::PathBuf;

use clap::Parser;

/// Create Dataverse records from a CSV file, addressing the entity and its
/// columns by display name.
#[derive(Debug, Parser)]
#[command(name = "bulk_load", version)]
pub struct Args {
    /// Connection config (environmentURI, clientID, tenantID, clientSecret).
    #[arg(long, default_value = "environment.json")]
    pub config: PathBuf,

    /// Display (or logical) name of the target entity, e.g. "Survey Finding".
    #[arg(long)]
    pub entity: String,

    /// CSV file whose headers are column display names.
    #[arg(long)]
    pub csv: PathBuf,

    /// Directory receiving a timestamped run folder with the report.
    #[arg(long, default_value = "_output")]
    pub output: PathBuf,

    /// Schema and token cache directory. Defaults to the platform cache dir.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Logical-name prefix of the entities to load into the schema cache.
    #[arg(long, default_value = "able_")]
    pub prefix: String,

    /// Bearer token to use instead of client credentials.
    #[arg(long, env = "DATAVERSE_TOKEN")]
    pub token: Option<String>,

    /// Log request bodies and responses.
    #[arg(short, long)]
    pub verbose: bool,
}
