//! Canonical k-mer machinery: encoding, counting, abundance histograms,
//! count correction and the copy-number oracle.

pub mod kmer;

mod corrector;
mod counter;
mod histogram;
mod oracle;

pub use corrector::{CountCorrector, DEFAULT_TRAINING_FRACTION};
pub use counter::KmerCounter;
pub use histogram::Histogram;
pub use oracle::{copy_number_from_count, KmerOracle, ReadKmerCounts};
