//! Command-line argument definitions.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tourledger", version, about = "Reservations, quotations and offers - works offline")]
pub struct Cli {
    /// Read from the local cache only; never contact the service
    #[arg(long, global = true)]
    pub local: bool,

    /// Print one summary line per record instead of JSON
    #[arg(long, global = true)]
    pub summary: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an already-issued bearer token
    Login {
        #[arg(long, env = "TOURLEDGER_TOKEN", hide_env_values = true)]
        token: String,
        /// Defaults to the last username given
        #[arg(long)]
        username: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show service availability and cache ages
    Status,
    /// Refresh every known collection from the service
    Refresh,
    /// Drop cached records, for one collection or all known ones
    ClearCache { collection: Option<String> },
    /// List all records of a collection
    List { collection: String },
    /// Show one record
    Get { collection: String, id: String },
    /// Create a record from a JSON object
    Create { collection: String, json: String },
    /// Patch a record with a JSON object
    Update {
        collection: String,
        id: String,
        json: String,
    },
    /// Delete a record
    Delete { collection: String, id: String },
    /// Show the actual-rates variant of a quotation
    ActualRates {
        quotation_id: String,
        /// Create the variant if it does not exist yet
        #[arg(long)]
        create: bool,
    },
    /// Save edits to an actual-rates record
    SaveActualRates { id: String, json: String },
}
