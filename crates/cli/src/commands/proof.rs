//! Inclusion proof commands.

use super::GlobalArgs;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use merklechain_chain::{InclusionProof, ProofService, ProofVerdict};
use merklechain_core::Hash;
use merklechain_storage::{load_proof, save_proof};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct GenerateProofArgs {
    /// Block height
    block_height: u64,

    /// Transaction hash (0x-prefixed hex)
    tx_hash: String,

    /// Output proof file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
pub struct VerifyProofArgs {
    /// Proof file to verify
    proof_file: PathBuf,
}

pub fn generate(global: &GlobalArgs, args: GenerateProofArgs) -> Result<()> {
    let tx_hash = Hash::from_hex(&args.tx_hash)
        .with_context(|| format!("Invalid transaction hash: {}", args.tx_hash))?;
    let chain = global.open_chain()?;

    let proof = ProofService::new(&chain).generate(args.block_height, &tx_hash)?;
    save_proof(&args.output, &proof)
        .with_context(|| format!("Failed to save proof: {}", args.output.display()))?;

    println!(
        "{}  Proof generated and saved to {}",
        "✓".green().bold(),
        args.output.display().to_string().bright_black()
    );
    Ok(())
}

/// Checks the proof on its own, and against the chain when
/// `--blockchain-state` is given. An invalid proof is reported as an error
/// so the process exits non-zero.
pub fn verify(global: &GlobalArgs, args: VerifyProofArgs) -> Result<()> {
    let proof: InclusionProof = load_proof(&args.proof_file)
        .with_context(|| format!("Failed to load proof: {}", args.proof_file.display()))?;

    let verdict = match &global.blockchain_state {
        Some(_) => {
            let chain = global.open_chain()?;
            ProofService::new(&chain).verify_against(&proof)
        }
        None => ProofService::verify(&proof),
    };

    match verdict {
        ProofVerdict::Valid => {
            println!("{}  Proof is {}", "✓".green().bold(), "VALID".green().bold());
            Ok(())
        }
        ProofVerdict::Invalid(reason) => {
            println!("{}  Proof is {}", "✗".red().bold(), "INVALID".red().bold());
            bail!("{reason}")
        }
    }
}
