use std::collections::HashMap;

/// Genotype quality values are capped so that a posterior of exactly 1.0
/// still yields a finite phred score.
const MAX_GENOTYPE_QUALITY: u32 = 10000;

/// Likelihoods below this floor are clamped before log-scaling.
const LIKELIHOOD_FLOOR: f64 = 1e-10;

/// Posterior genotype distribution and, when phasing ran, the Viterbi
/// haplotype pair for one variant. Genotypes are unordered and keyed by
/// the sorted allele pair.
#[derive(Debug, Clone, Default)]
pub struct GenotypingResult {
    likelihoods: HashMap<(u8, u8), f64>,
    haplotype: Option<(u8, u8)>,
    unreliable: bool,
}

impl GenotypingResult {
    pub fn new() -> GenotypingResult {
        GenotypingResult::default()
    }

    pub fn add_to_likelihood(&mut self, allele_1: u8, allele_2: u8, value: f64) {
        let key = Self::key(allele_1, allele_2);
        *self.likelihoods.entry(key).or_insert(0.0) += value;
    }

    pub fn get_genotype_likelihood(&self, allele_1: u8, allele_2: u8) -> f64 {
        self.likelihoods
            .get(&Self::key(allele_1, allele_2))
            .copied()
            .unwrap_or(0.0)
    }

    /// Scales the stored likelihoods to sum to one. Leaves an all-zero
    /// distribution untouched.
    pub fn normalize(&mut self) {
        let total: f64 = self.likelihoods.values().sum();
        if total > 0.0 {
            for value in self.likelihoods.values_mut() {
                *value /= total;
            }
        }
    }

    /// The maximum-a-posteriori genotype, or None when the distribution
    /// is empty, all-zero, or the maximum is not unique.
    pub fn get_likeliest_genotype(&self) -> Option<(u8, u8)> {
        let mut best: Option<((u8, u8), f64)> = None;
        let mut tied = false;
        for (genotype, value) in &self.likelihoods {
            match best {
                Some((_, best_value)) if *value > best_value => {
                    best = Some((*genotype, *value));
                    tied = false;
                }
                Some((_, best_value)) if *value == best_value => tied = true,
                None => best = Some((*genotype, *value)),
                _ => {}
            }
        }
        match best {
            Some((genotype, value)) if value > 0.0 && !tied => Some(genotype),
            _ => None,
        }
    }

    /// Phred-scaled confidence in the given genotype.
    pub fn get_genotype_quality(&self, allele_1: u8, allele_2: u8) -> u32 {
        let p = self.get_genotype_likelihood(allele_1, allele_2);
        let error = 1.0 - p;
        if error <= 0.0 {
            return MAX_GENOTYPE_QUALITY;
        }
        let quality = (-10.0 * error.log10()).round();
        (quality.max(0.0) as u32).min(MAX_GENOTYPE_QUALITY)
    }

    /// Log10-scaled likelihoods for all genotypes over `nr_alleles`
    /// alleles, in VCF genotype order: (j, k) with j <= k at index
    /// k*(k+1)/2 + j. Absent genotypes get the floor value.
    pub fn get_all_likelihoods(&self, nr_alleles: usize) -> Vec<f64> {
        let nr_genotypes = nr_alleles * (nr_alleles + 1) / 2;
        let mut result = vec![LIKELIHOOD_FLOOR.log10(); nr_genotypes];
        for ((a1, a2), value) in &self.likelihoods {
            let (j, k) = (*a1 as usize, *a2 as usize);
            if k >= nr_alleles {
                continue;
            }
            result[k * (k + 1) / 2 + j] = value.max(LIKELIHOOD_FLOOR).log10();
        }
        result
    }

    pub fn set_haplotype(&mut self, allele_1: u8, allele_2: u8) {
        self.haplotype = Some((allele_1, allele_2));
    }

    /// Viterbi-phased ordered allele pair; None when phasing did not run
    /// or the variant could not be phased.
    pub fn get_haplotype(&self) -> Option<(u8, u8)> {
        self.haplotype
    }

    /// Marks the variant as recovered from a zero-probability column; its
    /// posterior is a uniform fallback rather than a data-driven one.
    pub fn mark_unreliable(&mut self) {
        self.unreliable = true;
    }

    pub fn is_unreliable(&self) -> bool {
        self.unreliable
    }

    pub fn nr_genotypes(&self) -> usize {
        self.likelihoods.len()
    }

    fn key(allele_1: u8, allele_2: u8) -> (u8, u8) {
        if allele_1 <= allele_2 {
            (allele_1, allele_2)
        } else {
            (allele_2, allele_1)
        }
    }
}
