use crate::model::emission::EmissionProbabilityComputer;
use crate::model::genotyping_result::GenotypingResult;
use crate::model::transition::TransitionProbabilityComputer;
use crate::model::unique_kmers::UniqueKmers;
use crate::utils::Result;
use itertools::Itertools;

/// Distance multiplier applied to the recombination rate when genotyping
/// runs; phasing-only constructions use 1.0.
pub const GENOTYPING_DISTANCE_MULTIPLIER: f64 = 1.26;

const DEFAULT_EFFECTIVE_N: f64 = 25000.0;

#[derive(Debug, Clone)]
pub struct HmmParams {
    pub run_genotyping: bool,
    pub run_phasing: bool,
    pub distance_multiplier: f64,
    pub use_uniform_transitions: bool,
    pub effective_n: f64,
}

impl HmmParams {
    pub fn new(run_genotyping: bool, run_phasing: bool) -> HmmParams {
        HmmParams {
            run_genotyping,
            run_phasing,
            distance_multiplier: if run_genotyping {
                GENOTYPING_DISTANCE_MULTIPLIER
            } else {
                1.0
            },
            use_uniform_transitions: false,
            effective_n: DEFAULT_EFFECTIVE_N,
        }
    }
}

/// Trellis over one chromosome: one column per variant, states are
/// ordered pairs of panel path indices. Forward-Backward produces
/// genotype posteriors, Viterbi the phased path pair. The diploid
/// transition factorizes into two single-haplotype factors, so each
/// Forward/Backward column costs O(N^2) via row sums, column sums and
/// the column total instead of O(N^4).
#[derive(Debug)]
pub struct Hmm {
    genotyping_results: Vec<GenotypingResult>,
}

impl Hmm {
    pub fn new(unique_kmers: &[UniqueKmers], params: &HmmParams) -> Result<Hmm> {
        let mut results: Vec<GenotypingResult> =
            vec![GenotypingResult::new(); unique_kmers.len()];
        if unique_kmers.is_empty() {
            return Ok(Hmm {
                genotyping_results: results,
            });
        }

        let trellis = Trellis::new(unique_kmers, params)?;
        if params.run_genotyping {
            trellis.forward_backward(&mut results);
        }
        if params.run_phasing {
            trellis.viterbi(&mut results);
        }
        Ok(Hmm {
            genotyping_results: results,
        })
    }

    /// One result per variant, in variant order.
    pub fn get_genotyping_result(&self) -> &[GenotypingResult] {
        &self.genotyping_results
    }

    pub fn into_genotyping_results(self) -> Vec<GenotypingResult> {
        self.genotyping_results
    }
}

struct Trellis {
    nr_paths: usize,
    nr_states: usize,
    /// Allele carried by each panel path index, per variant.
    allele_assignments: Vec<Vec<u8>>,
    emissions: Vec<EmissionProbabilityComputer>,
    transitions: Vec<TransitionProbabilityComputer>,
    /// Variants whose emissions are zero for every path-pair state.
    degenerate: Vec<bool>,
}

impl Trellis {
    fn new(unique_kmers: &[UniqueKmers], params: &HmmParams) -> Result<Trellis> {
        let (panel_paths, _) = unique_kmers[0].get_path_ids(None);
        if panel_paths.is_empty() {
            return Err("HMM: variant panel contains no paths".to_string());
        }

        let mut allele_assignments = Vec::with_capacity(unique_kmers.len());
        for uk in unique_kmers {
            let (paths, alleles) = uk.get_path_ids(None);
            if paths != panel_paths {
                return Err(format!(
                    "HMM: path set of variant at position {} differs from the panel",
                    uk.get_variant_position()
                ));
            }
            allele_assignments.push(alleles);
        }

        let emissions: Vec<EmissionProbabilityComputer> = unique_kmers
            .iter()
            .map(EmissionProbabilityComputer::new)
            .collect::<Result<_>>()?;

        let transitions = unique_kmers
            .iter()
            .tuple_windows()
            .map(|(from, to)| {
                TransitionProbabilityComputer::new(
                    from.get_variant_position(),
                    to.get_variant_position(),
                    params.distance_multiplier,
                    panel_paths.len(),
                    params.effective_n,
                    params.use_uniform_transitions,
                )
            })
            .collect();

        let nr_paths = panel_paths.len();
        let nr_states = nr_paths * nr_paths;
        let mut trellis = Trellis {
            nr_paths,
            nr_states,
            allele_assignments,
            emissions,
            transitions,
            degenerate: Vec::new(),
        };
        trellis.degenerate = (0..unique_kmers.len())
            .map(|t| (0..trellis.nr_states).all(|s| trellis.emission_at(t, s) == 0.0))
            .collect();
        Ok(trellis)
    }

    fn alleles_of_state(&self, variant: usize, state: usize) -> (u8, u8) {
        let assignment = &self.allele_assignments[variant];
        (
            assignment[state / self.nr_paths],
            assignment[state % self.nr_paths],
        )
    }

    fn emission_at(&self, variant: usize, state: usize) -> f64 {
        let (allele_1, allele_2) = self.alleles_of_state(variant, state);
        self.emissions[variant].get_emission_probability(allele_1, allele_2)
    }

    /// Distinct unordered genotypes observable on the panel at a variant.
    fn observed_genotypes(&self, variant: usize) -> Vec<(u8, u8)> {
        (0..self.nr_states)
            .map(|s| {
                let (a1, a2) = self.alleles_of_state(variant, s);
                if a1 <= a2 {
                    (a1, a2)
                } else {
                    (a2, a1)
                }
            })
            .sorted()
            .dedup()
            .collect()
    }

    /// Applies the factorized transition update to a previous column:
    /// out(i, j) = stay^2 * col(i, j)
    ///           + stay * switch * (row_sum(i) + col_sum(j))
    ///           + switch^2 * total.
    fn mix_column(&self, column: &[f64], transition: &TransitionProbabilityComputer) -> Vec<f64> {
        let n = self.nr_paths;
        let mut row_sums = vec![0.0; n];
        let mut col_sums = vec![0.0; n];
        let mut total = 0.0;
        for i in 0..n {
            for j in 0..n {
                let value = column[i * n + j];
                row_sums[i] += value;
                col_sums[j] += value;
                total += value;
            }
        }
        let stay = transition.stay();
        let switch = transition.switch();
        let mut out = vec![0.0; self.nr_states];
        for i in 0..n {
            for j in 0..n {
                out[i * n + j] = stay * stay * column[i * n + j]
                    + stay * switch * (row_sums[i] + col_sums[j])
                    + switch * switch * total;
            }
        }
        out
    }

    /// Rescales a column to sum to one; an all-zero column becomes the
    /// uniform column and the caller is told about the degeneracy.
    fn rescale(&self, column: &mut [f64]) -> bool {
        let total: f64 = column.iter().sum();
        if total > 0.0 {
            for value in column.iter_mut() {
                *value /= total;
            }
            true
        } else {
            let uniform = 1.0 / self.nr_states as f64;
            for value in column.iter_mut() {
                *value = uniform;
            }
            false
        }
    }

    fn forward_backward(&self, results: &mut [GenotypingResult]) {
        let nr_variants = self.allele_assignments.len();

        // Forward pass, one rescaled column per variant.
        let mut forward: Vec<Vec<f64>> = Vec::with_capacity(nr_variants);
        for t in 0..nr_variants {
            let mut column = if t == 0 {
                let prior = 1.0 / self.nr_states as f64;
                vec![prior; self.nr_states]
            } else {
                self.mix_column(&forward[t - 1], &self.transitions[t - 1])
            };
            for (s, value) in column.iter_mut().enumerate() {
                *value *= self.emission_at(t, s);
            }
            if !self.rescale(&mut column) {
                results[t].mark_unreliable();
            }
            forward.push(column);
        }

        // Backward pass with a rolling column; posteriors are combined on
        // the fly and normalized per variant.
        let mut backward = vec![1.0 / self.nr_states as f64; self.nr_states];
        for t in (0..nr_variants).rev() {
            if self.degenerate[t] {
                // All emissions vanished: fall back to a uniform posterior
                // over the genotypes observable on the panel.
                for genotype in self.observed_genotypes(t) {
                    results[t].add_to_likelihood(genotype.0, genotype.1, 1.0);
                }
            } else {
                for s in 0..self.nr_states {
                    let (a1, a2) = self.alleles_of_state(t, s);
                    results[t].add_to_likelihood(a1, a2, forward[t][s] * backward[s]);
                }
            }
            results[t].normalize();

            if t > 0 {
                let weighted: Vec<f64> = (0..self.nr_states)
                    .map(|s| backward[s] * self.emission_at(t, s))
                    .collect();
                backward = self.mix_column(&weighted, &self.transitions[t - 1]);
                self.rescale(&mut backward);
            }
        }
    }

    fn viterbi(&self, results: &mut [GenotypingResult]) {
        let nr_variants = self.allele_assignments.len();
        let n = self.nr_paths;

        // Log-space scores; predecessors with probability zero stay at
        // negative infinity and are skipped by the max.
        let mut scores: Vec<f64> = (0..self.nr_states)
            .map(|s| {
                (1.0 / self.nr_states as f64).ln() + self.log_emission(0, s)
            })
            .collect();
        let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(nr_variants);
        backpointers.push(vec![0; self.nr_states]);

        for t in 1..nr_variants {
            let transition = &self.transitions[t - 1];
            let log_diag = (transition.stay() + transition.switch()).ln();
            let log_off = transition.switch().ln();

            let mut next = vec![f64::NEG_INFINITY; self.nr_states];
            let mut pointers = vec![0; self.nr_states];
            for to in 0..self.nr_states {
                let (to_i, to_j) = (to / n, to % n);
                let mut best = f64::NEG_INFINITY;
                let mut best_from = 0;
                for from in 0..self.nr_states {
                    let prev = scores[from];
                    if prev == f64::NEG_INFINITY {
                        continue;
                    }
                    let (from_i, from_j) = (from / n, from % n);
                    let first = if from_i == to_i { log_diag } else { log_off };
                    let second = if from_j == to_j { log_diag } else { log_off };
                    let candidate = prev + first + second;
                    if candidate > best {
                        best = candidate;
                        best_from = from;
                    }
                }
                if best > f64::NEG_INFINITY {
                    next[to] = best + self.log_emission(t, to);
                    pointers[to] = best_from;
                }
            }
            scores = next;
            backpointers.push(pointers);
        }

        // Lexicographically smallest state wins ties through strict
        // comparison in iteration order.
        let mut best_state = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (s, score) in scores.iter().enumerate() {
            if *score > best_score {
                best_score = *score;
                best_state = s;
            }
        }
        if best_score == f64::NEG_INFINITY {
            // No path has positive probability: leave every variant
            // unphased.
            return;
        }

        let mut state = best_state;
        for t in (0..nr_variants).rev() {
            if !self.degenerate[t] {
                let (a1, a2) = self.alleles_of_state(t, state);
                results[t].set_haplotype(a1, a2);
            }
            state = backpointers[t][state];
        }
    }

    /// Log emission; degenerate columns contribute no emission term so
    /// the chain stays alive and the variant is reported unphased.
    fn log_emission(&self, variant: usize, state: usize) -> f64 {
        if self.degenerate[variant] {
            0.0
        } else {
            self.emission_at(variant, state).ln()
        }
    }
}
