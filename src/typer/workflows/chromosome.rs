use crate::kmers::{KmerCounter, KmerOracle};
use crate::model::{GenotypingResult, Hmm, HmmParams};
use crate::typer::variants::VariantRecord;
use crate::typer::workflows::build_unique_kmers;
use crate::utils::Result;

/// Settings shared by all chromosome workers.
#[derive(Debug, Clone)]
pub struct WorkflowParams {
    pub run_genotyping: bool,
    pub run_phasing: bool,
    pub effective_n: f64,
    pub peak: usize,
}

/// Runs one chromosome end to end: builds the per-variant descriptors
/// from the oracles, runs the requested HMM passes and returns one
/// result per variant. The descriptors are dropped on return, before
/// the worker picks up its next chromosome.
pub fn analyze_chromosome(
    chromosome: &str,
    variants: &[VariantRecord],
    reference_seq: &[u8],
    genomic_counts: &KmerCounter,
    oracle: &dyn KmerOracle,
    params: &WorkflowParams,
) -> Result<Vec<GenotypingResult>> {
    log::info!("Determine unique kmers of chromosome {}", chromosome);
    let unique_kmers = build_unique_kmers(
        chromosome,
        variants,
        reference_seq,
        genomic_counts,
        oracle,
        params.peak,
    )?;
    let informative = unique_kmers.iter().filter(|uk| uk.size() > 0).count();
    log::info!(
        "{}: {} of {} variants have discriminating kmers",
        chromosome,
        informative,
        unique_kmers.len()
    );

    let mut hmm_params = HmmParams::new(params.run_genotyping, params.run_phasing);
    hmm_params.effective_n = params.effective_n;
    let hmm = Hmm::new(&unique_kmers, &hmm_params)
        .map_err(|e| format!("chromosome {}: {}", chromosome, e))?;
    Ok(hmm.into_genotyping_results())
}
