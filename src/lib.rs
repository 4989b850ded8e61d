//! Genotyping and phasing of known variants in a diploid sample, from
//! k-mer counts in short reads and a panel of reference haplotype paths.

pub mod cli;
pub mod commands;
pub mod kmers;
pub mod model;
pub mod typer;
pub mod utils;
