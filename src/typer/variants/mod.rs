//! The variant catalogue and its sequence context: VCF panel reading,
//! the in-memory reference and the path-segments FASTA.

mod reader;
mod record;
mod reference;
mod segments;

pub use reader::VariantCatalog;
pub use record::VariantRecord;
pub use reference::Reference;
pub use segments::{allele_segment, chromosome_segments, write_path_segments};
