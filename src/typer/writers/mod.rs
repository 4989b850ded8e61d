mod write_vcf;

pub use write_vcf::VcfWriter;
