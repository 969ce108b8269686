mod cli;

use clap::Parser;
use civitas_credential::CredentialConfig;
use civitas_types::IdentityProof;
use cli::{
    build_credential, classify_state, config_path, derive_commitment, derive_secret,
    init_logging, new_entropy, seal_witness, show_config, show_credential, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CredentialConfig::load(config_path(&cli))?;
    init_logging(&cli, &config)?;

    match cli.command {
        Commands::Commitment {
            document_number,
            nationality,
            birth_year,
            document_type,
        } => {
            let proof = IdentityProof::new(document_number, nationality, birth_year, document_type);
            derive_commitment(&config, proof, cli.format)?;
        }
        Commands::Entropy { user } => {
            new_entropy(&config, &user, cli.format)?;
        }
        Commands::Secret { user, commitment } => {
            derive_secret(&config, &user, &commitment, cli.format)?;
        }
        Commands::Classify {
            commitment,
            document_type,
            method,
            trust_score,
            district_verified,
            district_verified_at,
        } => {
            classify_state(
                commitment,
                document_type,
                method,
                trust_score,
                district_verified,
                district_verified_at,
                cli.format,
            )?;
        }
        Commands::Build { user, inputs } => {
            build_credential(&config, &user, &inputs, cli.format)?;
        }
        Commands::Show { user } => {
            show_credential(&config, &user, cli.format)?;
        }
        Commands::Witness {
            user,
            action_domain,
            output,
        } => {
            seal_witness(&config, &user, &action_domain, output.as_deref()).await?;
        }
        Commands::Config => {
            show_config(&config, cli.format)?;
        }
    }

    Ok(())
}
