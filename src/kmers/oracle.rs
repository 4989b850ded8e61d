use crate::kmers::corrector::CountCorrector;
use crate::kmers::counter::KmerCounter;
use crate::model::CopyNumber;
use crate::utils::Result;
use std::path::Path;

/// Mean count attributed to sequencing errors, relative to local haploid
/// coverage, with a floor so the zero-copy likelihood never degenerates.
const ERROR_COVERAGE_FRACTION: f64 = 0.1;
const MIN_ERROR_MEAN: f64 = 0.25;

/// Copy-number evidence served to the unique-k-mer builder. Must be safe
/// for concurrent read-only queries from the chromosome workers.
pub trait KmerOracle: Sync {
    fn corrected_count(&self, kmer: u64) -> u32;
    fn copy_number(&self, kmer: u64, local_coverage: f64) -> CopyNumber;
}

/// Read k-mer counts with composition-bias correction applied on lookup.
pub struct ReadKmerCounts {
    counts: KmerCounter,
    corrector: CountCorrector,
}

impl ReadKmerCounts {
    pub fn new(counts: KmerCounter, corrector: CountCorrector) -> ReadKmerCounts {
        ReadKmerCounts { counts, corrector }
    }

    pub fn kmer_size(&self) -> usize {
        self.counts.kmer_size()
    }

    /// Histogram of raw counts; returns the abundance peak.
    pub fn compute_histogram(&self, max_value: usize, path: &Path) -> Result<Option<usize>> {
        self.counts.compute_histogram(max_value, path)
    }

    /// Histogram after correction; returns the corrected abundance peak.
    pub fn compute_corrected_histogram(
        &self,
        max_value: usize,
        path: &Path,
    ) -> Result<Option<usize>> {
        let mut histogram = crate::kmers::Histogram::new(max_value);
        for (kmer, raw) in self.counts.iter() {
            histogram.add(self.corrector.correct(kmer, raw) as usize);
        }
        histogram.write_to_file(path)?;
        Ok(histogram.find_peak())
    }
}

impl KmerOracle for ReadKmerCounts {
    fn corrected_count(&self, kmer: u64) -> u32 {
        self.corrector.correct(kmer, self.counts.get_count(kmer))
    }

    fn copy_number(&self, kmer: u64, local_coverage: f64) -> CopyNumber {
        copy_number_from_count(self.corrected_count(kmer) as f64, local_coverage)
    }
}

/// Poisson likelihoods of an observed count under 0, 1 and 2 copies at
/// the given haploid coverage. The factorial term is identical for all
/// three copy numbers and CopyNumber is unnormalized, so it cancels; the
/// largest exponent is subtracted before exponentiating to keep the
/// values finite for high counts.
pub fn copy_number_from_count(count: f64, local_coverage: f64) -> CopyNumber {
    if local_coverage <= 0.0 {
        return CopyNumber::new(1.0, 1.0, 1.0);
    }
    let means = [
        (ERROR_COVERAGE_FRACTION * local_coverage).max(MIN_ERROR_MEAN),
        local_coverage,
        2.0 * local_coverage,
    ];
    let exponents = means.map(|mean| count * mean.ln() - mean);
    let max = exponents.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    CopyNumber::new(
        (exponents[0] - max).exp(),
        (exponents[1] - max).exp(),
        (exponents[2] - max).exp(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmers::kmer::canonical_from_seq;

    fn likeliest_copy(cn: &CopyNumber) -> u32 {
        (0..3)
            .max_by(|a, b| {
                cn.get_probability_of(*a)
                    .partial_cmp(&cn.get_probability_of(*b))
                    .unwrap()
            })
            .unwrap()
    }

    #[test]
    fn test_absent_kmer_favors_zero_copies() {
        let cn = copy_number_from_count(0.0, 15.0);
        assert_eq!(likeliest_copy(&cn), 0);
    }

    #[test]
    fn test_haploid_count_favors_one_copy() {
        let cn = copy_number_from_count(15.0, 15.0);
        assert_eq!(likeliest_copy(&cn), 1);
    }

    #[test]
    fn test_diploid_count_favors_two_copies() {
        let cn = copy_number_from_count(30.0, 15.0);
        assert_eq!(likeliest_copy(&cn), 2);
    }

    #[test]
    fn test_high_counts_stay_finite() {
        let cn = copy_number_from_count(5000.0, 20.0);
        for copy in 0..3 {
            assert!(cn.get_probability_of(copy).is_finite());
        }
        assert_eq!(cn.get_probability_of(2), 1.0);
    }

    #[test]
    fn test_zero_coverage_is_uninformative() {
        let cn = copy_number_from_count(4.0, 0.0);
        assert_eq!(cn.get_probability_of(0), cn.get_probability_of(2));
    }

    #[test]
    fn test_oracle_applies_correction() {
        let counter = KmerCounter::count_sequences([&b"ACGTA"[..]; 10], 5).unwrap();
        let oracle = ReadKmerCounts::new(counter, CountCorrector::identity(5, 3));
        let kmer = canonical_from_seq(b"ACGTA").unwrap();
        assert_eq!(oracle.corrected_count(kmer), 10);
        assert_eq!(likeliest_copy(&oracle.copy_number(kmer, 5.0)), 2);
    }
}
