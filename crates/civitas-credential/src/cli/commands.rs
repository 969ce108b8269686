use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "civitas")]
#[command(version = BUILD_VERSION)]
#[command(author = "Civitas <team@civitas.vote>")]
#[command(about = "Civitas - Verified-identity credentials and sealed proof witnesses")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Derive an identity commitment from document facts")]
    #[command(long_about = "Derive the salted identity commitment for a verified document.\n\nRequires the platform salt (CIVITAS_PLATFORM_SALT or platform_salt in the config file).")]
    Commitment {
        #[arg(long, value_name = "NUMBER", help = "Document number")]
        document_number: String,
        #[arg(long, value_name = "CODE", help = "2-letter nationality code")]
        nationality: String,
        #[arg(long, value_name = "YEAR", help = "Birth year")]
        birth_year: i32,
        #[arg(long, value_name = "TYPE", help = "passport, drivers_license, national_id or state_id")]
        document_type: String,
    },

    #[command(about = "Generate and seal a user's entropy")]
    #[command(long_about = "Draw fresh entropy for a user and store it sealed under the device secret.\n\nExisting entropy is never replaced. The raw value is not printed. Requires CIVITAS_DEVICE_SECRET or device_secret in the config file.")]
    Entropy {
        #[arg(long, value_name = "ID", help = "User id")]
        user: String,
    },

    #[command(about = "Derive the user secret from a commitment and the user's sealed entropy")]
    Secret {
        #[arg(long, value_name = "ID", help = "User id whose sealed entropy to use")]
        user: String,
        #[arg(long, value_name = "HEX", help = "Identity commitment")]
        commitment: String,
    },

    #[command(about = "Classify a verification state into authority level and trust tier")]
    Classify {
        #[arg(long, value_name = "HEX", help = "Identity commitment, if verified")]
        commitment: Option<String>,
        #[arg(long, value_name = "TYPE", help = "Verified document type")]
        document_type: Option<String>,
        #[arg(long, value_name = "METHOD", help = "self.xyz, didit or digital-credentials-api")]
        method: Option<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true, help = "Trust score")]
        trust_score: i64,
        #[arg(long, help = "District has been verified")]
        district_verified: bool,
        #[arg(long, value_name = "RFC3339", help = "When the district was verified")]
        district_verified_at: Option<DateTime<Utc>>,
    },

    #[command(about = "Build a session credential and store it")]
    #[command(long_about = "Build a session credential from a JSON inputs file.\n\nThe inputs carry the private values and the sibling paths published by the registry. The finished credential is stored under the given user id.")]
    Build {
        #[arg(long, value_name = "ID", help = "User id to store the credential under")]
        user: String,
        #[arg(long, value_name = "FILE", help = "Credential inputs (JSON)")]
        inputs: PathBuf,
    },

    #[command(about = "Show a stored credential")]
    Show {
        #[arg(long, value_name = "ID", help = "User id")]
        user: String,
    },

    #[command(about = "Assemble and seal a witness for the prover")]
    Witness {
        #[arg(long, value_name = "ID", help = "User id")]
        user: String,
        #[arg(long, value_name = "HEX", help = "Action domain field element")]
        action_domain: String,
        #[arg(short, long, value_name = "FILE", help = "Write the sealed witness to a file")]
        output: Option<PathBuf>,
    },

    #[command(about = "Show the effective configuration")]
    Config,
}
