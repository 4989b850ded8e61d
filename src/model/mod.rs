//! The genotyping and phasing engine: per-variant k-mer descriptors and
//! the Li-Stephens HMM over panel path pairs.

mod copy_number;
mod emission;
mod genotyping_result;
mod hmm;
mod kmer_path;
mod transition;
mod unique_kmers;

pub use copy_number::CopyNumber;
pub use emission::EmissionProbabilityComputer;
pub use genotyping_result::GenotypingResult;
pub use hmm::{Hmm, HmmParams, GENOTYPING_DISTANCE_MULTIPLIER};
pub use kmer_path::{CopyNumberAssignment, KmerPath};
pub use transition::TransitionProbabilityComputer;
pub use unique_kmers::UniqueKmers;
