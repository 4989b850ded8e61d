/// Li-Stephens transition factors between the path-pair states of two
/// neighbouring variants.
///
/// The per-haplotype recombination probability over d bases is
/// rho = 1 - exp(-d * 1e-6 * 0.04 * Ne * m / N), where m is the distance
/// multiplier and 0.04 * Ne the morgan-scaled recombination constant of
/// the underlying model (1e-6 converts bases to megabases). The diploid
/// transition factorizes into the product of two single-haplotype
/// factors, so only the stay and switch components are stored and the
/// N^2 x N^2 matrix is never materialized.
#[derive(Debug, Clone)]
pub struct TransitionProbabilityComputer {
    stay: f64,
    switch: f64,
}

const RECOMB_CONSTANT: f64 = 0.04;
const BASES_PER_MEGABASE: f64 = 1_000_000.0;

impl TransitionProbabilityComputer {
    /// Negative distances (catalogue reordering) clamp to zero. With
    /// `uniform`, distance is ignored and every pair transition is 1/N^2.
    pub fn new(
        from_position: usize,
        to_position: usize,
        distance_multiplier: f64,
        nr_paths: usize,
        effective_n: f64,
        uniform: bool,
    ) -> TransitionProbabilityComputer {
        let nr_paths = nr_paths.max(1) as f64;
        if uniform {
            return TransitionProbabilityComputer {
                stay: 0.0,
                switch: 1.0 / nr_paths,
            };
        }
        let distance =
            to_position.saturating_sub(from_position) as f64 / BASES_PER_MEGABASE * distance_multiplier;
        let rho = 1.0 - (-distance * RECOMB_CONSTANT * effective_n / nr_paths).exp();
        TransitionProbabilityComputer {
            stay: 1.0 - rho,
            switch: rho / nr_paths,
        }
    }

    /// Off-diagonal single-haplotype factor (rho / N).
    pub fn switch(&self) -> f64 {
        self.switch
    }

    /// Diagonal excess over the off-diagonal factor (1 - rho); the full
    /// diagonal entry is stay() + switch().
    pub fn stay(&self) -> f64 {
        self.stay
    }

    pub fn haplotype_transition(&self, from_path: usize, to_path: usize) -> f64 {
        if from_path == to_path {
            self.stay + self.switch
        } else {
            self.switch
        }
    }

    /// Probability of moving from pair state (p, q) to (p', q').
    pub fn compute_transition_prob(
        &self,
        from: (usize, usize),
        to: (usize, usize),
    ) -> f64 {
        self.haplotype_transition(from.0, to.0) * self.haplotype_transition(from.1, to.1)
    }
}
