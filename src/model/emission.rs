use crate::model::unique_kmers::UniqueKmers;
use crate::utils::Result;
use std::collections::HashMap;

/// Precomputed genotype likelihoods for a single variant.
///
/// For the genotype (a1, a2) every k-mer i has an expected copy count
/// given by the positional sum of the two alleles' k-mer sets; the
/// emission is the product over all k-mers of the copy-number likelihood
/// at that count. Genotypes are unordered, so entries are keyed by the
/// sorted allele pair.
#[derive(Debug, Clone)]
pub struct EmissionProbabilityComputer {
    probabilities: HashMap<(u8, u8), f64>,
}

impl EmissionProbabilityComputer {
    pub fn new(unique_kmers: &UniqueKmers) -> Result<EmissionProbabilityComputer> {
        let allele_ids = unique_kmers.get_allele_ids();
        let mut probabilities = HashMap::new();
        for (i, allele_1) in allele_ids.iter().enumerate() {
            for allele_2 in &allele_ids[i..] {
                let p = Self::compute_emission(unique_kmers, *allele_1, *allele_2)?;
                probabilities.insert((*allele_1, *allele_2), p);
            }
        }
        Ok(EmissionProbabilityComputer { probabilities })
    }

    fn compute_emission(unique_kmers: &UniqueKmers, allele_1: u8, allele_2: u8) -> Result<f64> {
        let assignment = unique_kmers.combine_paths(allele_1, allele_2)?;
        let mut probability = 1.0;
        for kmer_index in 0..unique_kmers.size() {
            let copy_number = unique_kmers.get_copynumber_of(kmer_index)?;
            probability *= copy_number.get_probability_of(assignment.get(kmer_index));
        }
        Ok(probability)
    }

    /// Table lookup; symmetric in the two alleles. Genotypes over alleles
    /// not present at this variant have probability 0.
    pub fn get_emission_probability(&self, allele_1: u8, allele_2: u8) -> f64 {
        let key = if allele_1 <= allele_2 {
            (allele_1, allele_2)
        } else {
            (allele_2, allele_1)
        };
        self.probabilities.get(&key).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::copy_number::CopyNumber;

    fn descriptor_with(kmers: &[(CopyNumber, &[u8])]) -> UniqueKmers {
        let mut uk = UniqueKmers::new(2000);
        uk.insert_empty_allele(0);
        uk.insert_empty_allele(1);
        uk.insert_path(0, 0);
        uk.insert_path(1, 1);
        for (cn, alleles) in kmers {
            uk.insert_kmer(cn.clone(), alleles).unwrap();
        }
        uk
    }

    #[test]
    fn test_emission_is_symmetric() {
        let uk = descriptor_with(&[
            (CopyNumber::new(0.2, 0.5, 0.3), &[0][..]),
            (CopyNumber::new(0.1, 0.6, 0.3), &[1][..]),
        ]);
        let computer = EmissionProbabilityComputer::new(&uk).unwrap();
        assert_eq!(
            computer.get_emission_probability(0, 1),
            computer.get_emission_probability(1, 0)
        );
    }

    #[test]
    fn test_emission_products() {
        // One kmer on allele 0 with likelihoods (0.1, 0.7, 0.2), one on
        // allele 1 with (0.3, 0.6, 0.1).
        let uk = descriptor_with(&[
            (CopyNumber::new(0.1, 0.7, 0.2), &[0][..]),
            (CopyNumber::new(0.3, 0.6, 0.1), &[1][..]),
        ]);
        let computer = EmissionProbabilityComputer::new(&uk).unwrap();
        // 0/0: kmer 0 has copies 2, kmer 1 has copies 0.
        assert!((computer.get_emission_probability(0, 0) - 0.2 * 0.3).abs() < 1e-12);
        // 0/1: both kmers have one copy.
        assert!((computer.get_emission_probability(0, 1) - 0.7 * 0.6).abs() < 1e-12);
        // 1/1: kmer 0 absent, kmer 1 has copies 2.
        assert!((computer.get_emission_probability(1, 1) - 0.1 * 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_genotype_is_zero() {
        let uk = descriptor_with(&[(CopyNumber::new(0.1, 0.7, 0.2), &[0][..])]);
        let computer = EmissionProbabilityComputer::new(&uk).unwrap();
        assert_eq!(computer.get_emission_probability(0, 5), 0.0);
    }

    #[test]
    fn test_single_copy_kmer_prefers_single_copy_genotypes() {
        // A kmer unique to allele 0 observed exactly once: genotypes
        // carrying allele 0 once beat those carrying it zero or two times.
        let uk = descriptor_with(&[(CopyNumber::new(0.0, 1.0, 0.0), &[0][..])]);
        let computer = EmissionProbabilityComputer::new(&uk).unwrap();
        let het = computer.get_emission_probability(0, 1);
        assert!(het > computer.get_emission_probability(0, 0));
        assert!(het > computer.get_emission_probability(1, 1));
    }

    #[test]
    fn test_no_kmers_gives_flat_emissions() {
        let uk = descriptor_with(&[]);
        let computer = EmissionProbabilityComputer::new(&uk).unwrap();
        assert_eq!(computer.get_emission_probability(0, 0), 1.0);
        assert_eq!(computer.get_emission_probability(0, 1), 1.0);
        assert_eq!(computer.get_emission_probability(1, 1), 1.0);
    }
}
