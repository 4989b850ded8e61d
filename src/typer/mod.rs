//! Everything around the engine: the variant catalogue, per-chromosome
//! workflows and the VCF writers.

pub mod variants;
pub mod workflows;
pub mod writers;
