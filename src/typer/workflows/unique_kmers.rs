use crate::kmers::kmer::CanonicalKmers;
use crate::kmers::{KmerCounter, KmerOracle};
use crate::model::UniqueKmers;
use crate::typer::variants::{allele_segment, VariantRecord};
use crate::utils::{median, Result};
use std::collections::BTreeMap;

/// Cap on the discriminating k-mers kept per variant; beyond this the
/// emission products stop gaining information.
const MAX_UNIQUE_KMERS_PER_VARIANT: usize = 300;

/// Reference bases on each side of a variant whose k-mers estimate the
/// local coverage, as a multiple of k.
const COVERAGE_WINDOW_KMERS: usize = 2;

/// Builds the ordered list of per-variant descriptors for one
/// chromosome: every allele declared, every panel path bound, and up to
/// the cap of k-mers that occur nowhere in the genome outside this
/// variant's allele segments.
pub fn build_unique_kmers(
    chromosome: &str,
    variants: &[VariantRecord],
    reference_seq: &[u8],
    genomic_counts: &KmerCounter,
    oracle: &dyn KmerOracle,
    peak: usize,
) -> Result<Vec<UniqueKmers>> {
    let k = genomic_counts.kmer_size();
    let mut result = Vec::with_capacity(variants.len());
    for variant in variants {
        let coverage =
            compute_local_coverage(reference_seq, variant, genomic_counts, oracle, peak);

        let mut unique_kmers = UniqueKmers::new(variant.position());
        for allele_id in 0..variant.nr_alleles() as u8 {
            unique_kmers.insert_empty_allele(allele_id);
        }
        for (path_id, allele_id) in variant.path_alleles().iter().enumerate() {
            unique_kmers.insert_path(path_id, *allele_id);
        }
        unique_kmers.set_coverage(coverage);

        // K-mer to the alleles containing it, in allele order. The
        // ordered map keeps the selection below the cap deterministic.
        let mut occurrences: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
        for allele_id in 0..variant.nr_alleles() as u8 {
            let segment = allele_segment(reference_seq, variant, allele_id, k)?;
            for kmer in CanonicalKmers::new(&segment, k) {
                occurrences.entry(kmer).or_default().push(allele_id);
            }
        }

        let mut inserted = 0;
        for (kmer, alleles) in occurrences {
            if inserted >= MAX_UNIQUE_KMERS_PER_VARIANT {
                log::debug!(
                    "{}:{}: more than {} unique kmers, rest skipped",
                    chromosome,
                    variant.position() + 1,
                    MAX_UNIQUE_KMERS_PER_VARIANT
                );
                break;
            }
            // Repeated within a single allele: its copy count would
            // exceed the diploid range.
            if alleles.windows(2).any(|pair| pair[0] == pair[1]) {
                continue;
            }
            // Present elsewhere in the genome: not discriminating.
            if genomic_counts.get_count(kmer) as usize != alleles.len() {
                continue;
            }
            unique_kmers.insert_kmer(oracle.copy_number(kmer, coverage), &alleles)?;
            inserted += 1;
        }
        log::trace!(
            "{}:{}: {} unique kmers, local coverage {:.2}",
            chromosome,
            variant.position() + 1,
            unique_kmers.size(),
            coverage
        );
        result.push(unique_kmers);
    }
    Ok(result)
}

/// Local haploid coverage around a variant: half the median corrected
/// count of nearby reference k-mers that are unique in the genome,
/// clamped against the global abundance peak; falls back to half the
/// peak when no such k-mer exists.
fn compute_local_coverage(
    reference_seq: &[u8],
    variant: &VariantRecord,
    genomic_counts: &KmerCounter,
    oracle: &dyn KmerOracle,
    peak: usize,
) -> f64 {
    let k = genomic_counts.kmer_size();
    let window = (COVERAGE_WINDOW_KMERS + 1) * k;

    let left_end = variant.position().min(reference_seq.len());
    let left = &reference_seq[left_end.saturating_sub(window)..left_end];
    let right = if variant.end() < reference_seq.len() {
        let right_end = (variant.end() + window).min(reference_seq.len());
        &reference_seq[variant.end()..right_end]
    } else {
        &[][..]
    };

    let mut counts: Vec<u32> = Vec::new();
    for region in [left, right] {
        for kmer in CanonicalKmers::new(region, k) {
            if genomic_counts.get_count(kmer) == 1 {
                counts.push(oracle.corrected_count(kmer));
            }
        }
    }

    let peak = peak as f64;
    let diploid_coverage = match median(&mut counts) {
        Some(value) if value > 0.0 => value.clamp(peak / 2.0, 2.0 * peak),
        _ => peak,
    };
    diploid_coverage / 2.0
}
