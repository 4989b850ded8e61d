use crate::kmers::counter::KmerCounter;
use crate::utils::median;

/// Number of covariate buckets the GC range is split into.
const NR_BUCKETS: usize = 10;

/// Correction factors are clamped so that a sparsely populated bucket
/// cannot distort counts by more than a factor of two.
const MIN_FACTOR: f64 = 0.5;
const MAX_FACTOR: f64 = 2.0;

/// Fraction of training k-mers the parallel driver samples.
pub const DEFAULT_TRAINING_FRACTION: f64 = 0.1;

/// Composition-bias correction of read k-mer counts.
///
/// Trained on k-mers that occur exactly once in the genomic segments and
/// were seen in the reads: their counts all estimate the same diploid
/// coverage, so a systematic shift within a covariate bucket is bias.
/// The covariate is the mean GC fraction over the k-mer's small-k
/// windows, which weights interior bases more than the edges. The
/// subsample is drawn with a deterministic hash filter so that training
/// does not depend on map iteration order.
#[derive(Debug, Clone)]
pub struct CountCorrector {
    k: usize,
    small_k: usize,
    factors: Vec<f64>,
}

impl CountCorrector {
    pub fn train(
        read_counts: &KmerCounter,
        genomic_counts: &KmerCounter,
        small_k: usize,
        training_fraction: f64,
    ) -> CountCorrector {
        let k = genomic_counts.kmer_size();
        let small_k = small_k.clamp(1, k);

        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); NR_BUCKETS];
        let mut all_counts: Vec<u32> = Vec::new();
        for (kmer, genomic_count) in genomic_counts.iter() {
            if genomic_count != 1 || !sampled(kmer, training_fraction) {
                continue;
            }
            let raw = read_counts.get_count(kmer);
            if raw == 0 {
                // Absent from the sample (e.g. an alternative allele the
                // sample does not carry); carries no coverage signal.
                continue;
            }
            buckets[covariate_bucket(kmer, k, small_k)].push(raw);
            all_counts.push(raw);
        }

        let global_median = median(&mut all_counts);
        let factors = buckets
            .iter_mut()
            .map(|bucket| match (global_median, median(bucket)) {
                (Some(global), Some(local)) if local > 0.0 => {
                    (global / local).clamp(MIN_FACTOR, MAX_FACTOR)
                }
                _ => 1.0,
            })
            .collect();

        CountCorrector {
            k,
            small_k,
            factors,
        }
    }

    /// Identity correction, for tests and degenerate inputs.
    pub fn identity(k: usize, small_k: usize) -> CountCorrector {
        CountCorrector {
            k,
            small_k: small_k.clamp(1, k),
            factors: vec![1.0; NR_BUCKETS],
        }
    }

    pub fn correct(&self, kmer: u64, raw_count: u32) -> u32 {
        let factor = self.factors[covariate_bucket(kmer, self.k, self.small_k)];
        (raw_count as f64 * factor).round() as u32
    }
}

/// Deterministic subsampling filter over the k-mer value itself.
fn sampled(kmer: u64, fraction: f64) -> bool {
    let mixed = (kmer ^ 0x51_7c_c1_b7_27_22_0a_95).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    (mixed >> 11) as f64 / (1u64 << 53) as f64 <= fraction
}

/// Mean GC fraction over the k-mer's small-k windows, mapped to a bucket.
fn covariate_bucket(kmer: u64, k: usize, small_k: usize) -> usize {
    // Code of the i-th base counted from the left.
    let code_at = |i: usize| (kmer >> (2 * (k - 1 - i))) & 3;
    let is_gc = |code: u64| code == 1 || code == 2;

    let mut gc_in_window: usize = (0..small_k).filter(|i| is_gc(code_at(*i))).count();
    let mut total = gc_in_window;
    let nr_windows = k - small_k + 1;
    for start in 1..nr_windows {
        if is_gc(code_at(start - 1)) {
            gc_in_window -= 1;
        }
        if is_gc(code_at(start + small_k - 1)) {
            gc_in_window += 1;
        }
        total += gc_in_window;
    }
    let mean_gc = total as f64 / (nr_windows * small_k) as f64;
    ((mean_gc * NR_BUCKETS as f64) as usize).min(NR_BUCKETS - 1)
}
