//! credflow - credential lifecycle CLI
//!
//! One subcommand per workflow step against the issuer, holder and
//! verifier agents.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credflow::{
    issuance::{generate_controller_did, CredentialAttributes},
    proof::ProofOutcome,
    revocation::{CredentialSelector, RevocationOutcome},
    state::StateConfig,
    workflow::{Workflow, WorkflowConfig},
    Result,
};

#[derive(Parser, Debug)]
#[command(name = "credflow", version, about = "Drive the verifiable-credential lifecycle across three agents")]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "CREDFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Issuer admin URL
    #[arg(long, env = "CREDFLOW_ISSUER_URL")]
    issuer_url: Option<String>,

    /// Holder admin URL
    #[arg(long, env = "CREDFLOW_HOLDER_URL")]
    holder_url: Option<String>,

    /// Verifier admin URL
    #[arg(long, env = "CREDFLOW_VERIFIER_URL")]
    verifier_url: Option<String>,

    /// Admin API key sent to every agent
    #[arg(long, env = "CREDFLOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Workflow state document
    #[arg(long, env = "CREDFLOW_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "CREDFLOW_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect issuer and verifier to the holder
    EstablishConnections,
    /// Publish the schema and revocable credential definition
    ProvisionIssuer,
    /// Offer a personhood credential to the holder
    IssueCredential(IssueArgs),
    /// Ask the holder for a personhood proof
    RequestProof,
    /// Revoke a holder credential
    RevokeCredential(RevokeArgs),
    /// List revocation registries of the provisioned credential definition
    RevocationRegistries,
    /// Every step in order
    RunAll {
        #[command(flatten)]
        issue: IssueArgs,
        /// Revoke the credential and request the proof again
        #[arg(long)]
        revoke: bool,
    },
    /// Delete holder credentials and credential exchange records
    CleanAgents,
    /// Print the workflow state
    ShowState,
    /// Delete the workflow state
    ResetState,
}

#[derive(Args, Debug)]
struct IssueArgs {
    #[arg(long, default_value = "humano-anoncreds-v2")]
    person_hash: String,
    #[arg(long, default_value = "100.0")]
    biometric_score: String,
    /// Generated when omitted
    #[arg(long)]
    controller_did: Option<String>,
}

impl IssueArgs {
    fn attributes(&self) -> Result<CredentialAttributes> {
        let controller_did = self
            .controller_did
            .clone()
            .unwrap_or_else(generate_controller_did);
        CredentialAttributes::new(&self.person_hash, &self.biometric_score, &controller_did)
    }
}

#[derive(Args, Debug)]
struct RevokeArgs {
    /// Wallet referent of the credential
    #[arg(long)]
    referent: Option<String>,
    /// Revoke the latest credential of this definition
    #[arg(long, conflicts_with = "referent")]
    cred_def_id: Option<String>,
}

impl RevokeArgs {
    fn selector(&self) -> CredentialSelector {
        match (&self.referent, &self.cred_def_id) {
            (Some(referent), _) => CredentialSelector::Referent(referent.clone()),
            (None, Some(cred_def_id)) => CredentialSelector::CredDefId(cred_def_id.clone()),
            (None, None) => CredentialSelector::First,
        }
    }
}

impl Cli {
    fn workflow_config(&self) -> Result<WorkflowConfig> {
        let mut config = match &self.config {
            Some(path) => WorkflowConfig::load(path)?,
            None => WorkflowConfig::default(),
        };
        let agents = &mut config.agents;
        for (agent, url) in [
            (&mut agents.issuer, &self.issuer_url),
            (&mut agents.holder, &self.holder_url),
            (&mut agents.verifier, &self.verifier_url),
        ] {
            if let Some(url) = url {
                agent.base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(key) = &self.api_key {
                agent.api_key = Some(key.clone());
            }
        }
        if let Some(path) = &self.state_file {
            config.state = StateConfig::file(path);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("credflow={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("ERROR: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let workflow = Workflow::from_config(cli.workflow_config()?)?;

    match &cli.command {
        Command::EstablishConnections => {
            let (issuer, verifier) = workflow.establish_connections().await?;
            println!("Issuer <-> holder:   {}", issuer.connection_id);
            println!("Verifier <-> holder: {}", verifier.connection_id);
        }
        Command::ProvisionIssuer => {
            let ids = workflow.provision_issuer().await?;
            println!("Issuer DID:  {}", ids.issuer_did);
            println!("Schema ID:   {}", ids.schema_id);
            println!("Cred Def ID: {}", ids.cred_def_id);
        }
        Command::IssueCredential(args) => {
            let report = workflow.issue_credential(&args.attributes()?).await?;
            println!("Exchange {}: {:?}", report.cred_ex_id, report.outcome);
            println!("Holder has {} credential(s)", report.credentials_after);
            if !report.is_success() {
                return Ok(ExitCode::from(1));
            }
        }
        Command::RequestProof => {
            let report = workflow.request_proof().await?;
            return Ok(print_proof(&report.outcome));
        }
        Command::RevokeCredential(args) => {
            let outcome = workflow.revoke_credential(&args.selector()).await?;
            return Ok(print_revocation(&outcome));
        }
        Command::RevocationRegistries => {
            let registries = workflow.revocation_registries().await?;
            if registries.is_empty() {
                println!("No revocation registries");
            }
            for rev_reg_id in registries {
                println!("{}", rev_reg_id);
            }
        }
        Command::RunAll { issue, revoke } => {
            let summary = workflow.run_all(&issue.attributes()?, *revoke).await?;
            println!("Cred Def ID: {}", summary.provisioned.cred_def_id);
            println!(
                "Holder credentials: {} -> {}",
                summary.issuance.credentials_before, summary.issuance.credentials_after
            );
            let code = print_proof(&summary.proof.outcome);
            if !summary.proof.outcome.is_granted() {
                return Ok(code);
            }
            if let Some(outcome) = &summary.revocation {
                let revoked = print_revocation(outcome);
                if !outcome.is_revoked() {
                    return Ok(revoked);
                }
            }
            if let Some(report) = &summary.proof_after_revocation {
                print_proof(&report.outcome);
            }
            return Ok(code);
        }
        Command::CleanAgents => {
            let report = workflow.clean_agents().await?;
            println!(
                "Deleted {} credential(s) and {} exchange record(s)",
                report.credentials_deleted, report.exchanges_deleted
            );
            if report.failures > 0 {
                println!("{} delete(s) refused", report.failures);
                return Ok(ExitCode::from(1));
            }
        }
        Command::ShowState => {
            let snapshot = workflow.state().snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::ResetState => {
            workflow.state().reset().await?;
            println!("Workflow state cleared");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_proof(outcome: &ProofOutcome) -> ExitCode {
    println!("Proof: {}", outcome);
    match outcome {
        ProofOutcome::AccessGranted => ExitCode::SUCCESS,
        ProofOutcome::AccessDenied { messages } => {
            for message in messages {
                println!("  reason: {}", message);
            }
            ExitCode::from(2)
        }
        ProofOutcome::Timeout { polls } => {
            println!("  no answer after {} polls", polls);
            ExitCode::from(2)
        }
        ProofOutcome::RecordVanished => ExitCode::from(1),
    }
}

fn print_revocation(outcome: &RevocationOutcome) -> ExitCode {
    match outcome {
        RevocationOutcome::Revoked { target } => {
            println!(
                "Revoked {} (registry {}, index {})",
                target.referent, target.rev_reg_id, target.cred_rev_id
            );
            ExitCode::SUCCESS
        }
        RevocationOutcome::Rejected { status, body } => {
            println!("Revocation rejected (HTTP {}): {}", status, body);
            ExitCode::from(1)
        }
    }
}
