use crate::typer::variants::VariantRecord;
use crate::utils::Result;
use rust_htslib::bcf::{self, record::GenotypeAllele, Read};
use std::collections::HashMap;
use std::path::Path;

/// At most 255 alleles per variant so that allele IDs fit a byte.
const MAX_ALLELES: usize = 255;

/// The variant catalogue: per chromosome an ordered list of variants,
/// each annotated with the allele every panel path carries. Panel paths
/// are the two haplotypes of each VCF sample, in sample order.
/// Chromosomes keep the order of their first appearance in the file.
#[derive(Debug)]
pub struct VariantCatalog {
    chromosomes: Vec<String>,
    variants: HashMap<String, Vec<VariantRecord>>,
    nr_paths: usize,
}

impl VariantCatalog {
    pub fn from_vcf(path: &Path) -> Result<VariantCatalog> {
        let mut reader = bcf::Reader::from_path(path)
            .map_err(|e| format!("Failed to open VCF file {}: {}", path.display(), e))?;
        let header = reader.header().clone();

        let nr_samples = header.sample_count() as usize;
        if nr_samples == 0 {
            return Err(format!(
                "VCF file {} contains no panel samples",
                path.display()
            ));
        }
        let nr_paths = 2 * nr_samples;

        let mut chromosomes: Vec<String> = Vec::new();
        let mut variants: HashMap<String, Vec<VariantRecord>> = HashMap::new();
        let mut seen_unphased = false;

        for record in reader.records() {
            let record = record
                .map_err(|e| format!("Failed to read VCF record in {}: {}", path.display(), e))?;
            let rid = record
                .rid()
                .ok_or_else(|| format!("VCF record without chromosome in {}", path.display()))?;
            let chromosome = String::from_utf8(header.rid2name(rid).map_err(|e| e.to_string())?.to_vec())
                .map_err(|e| format!("Invalid chromosome name in {}: {}", path.display(), e))?;
            let position = record.pos() as usize;

            let alleles: Vec<Vec<u8>> = record.alleles().iter().map(|a| a.to_ascii_uppercase()).collect();
            if alleles.len() < 2 {
                return Err(format!(
                    "{}:{}: variant defines no alternative allele",
                    chromosome,
                    position + 1
                ));
            }
            if alleles.len() > MAX_ALLELES {
                return Err(format!(
                    "{}:{}: more than {} alleles are not supported",
                    chromosome,
                    position + 1,
                    MAX_ALLELES
                ));
            }
            for allele in &alleles {
                if allele.is_empty()
                    || !allele
                        .iter()
                        .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N'))
                {
                    return Err(format!(
                        "{}:{}: unsupported allele {:?}; only sequence alleles are allowed",
                        chromosome,
                        position + 1,
                        String::from_utf8_lossy(allele)
                    ));
                }
            }

            let genotypes = record
                .genotypes()
                .map_err(|e| format!("{}:{}: {}", chromosome, position + 1, e))?;
            let mut path_to_allele = Vec::with_capacity(nr_paths);
            for sample in 0..nr_samples {
                let genotype: Vec<GenotypeAllele> =
                    genotypes.get(sample).iter().copied().collect();
                if genotype.len() != 2 {
                    return Err(format!(
                        "{}:{}: sample {} is not diploid",
                        chromosome,
                        position + 1,
                        sample
                    ));
                }
                for (haplotype, allele) in genotype.iter().enumerate() {
                    let index = match allele {
                        GenotypeAllele::Unphased(index) | GenotypeAllele::Phased(index) => {
                            if haplotype == 1 && matches!(allele, GenotypeAllele::Unphased(_)) {
                                seen_unphased = true;
                            }
                            *index
                        }
                        GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => {
                            return Err(format!(
                                "{}:{}: missing panel allele for sample {}",
                                chromosome,
                                position + 1,
                                sample
                            ))
                        }
                    };
                    if index < 0 || index as usize >= alleles.len() {
                        return Err(format!(
                            "{}:{}: sample {} references unknown allele {}",
                            chromosome,
                            position + 1,
                            sample,
                            index
                        ));
                    }
                    path_to_allele.push(index as u8);
                }
            }

            let new_record = VariantRecord::new(position, alleles, path_to_allele);
            if !variants.contains_key(&chromosome) {
                chromosomes.push(chromosome.clone());
            }
            let chromosome_variants = variants.entry(chromosome.clone()).or_default();
            if let Some(previous) = chromosome_variants.last() {
                if new_record.position() < previous.end() {
                    return Err(format!(
                        "{}:{}: variants must be sorted and non-overlapping",
                        chromosome,
                        new_record.position() + 1
                    ));
                }
            }
            chromosome_variants.push(new_record);
        }

        if chromosomes.is_empty() {
            return Err(format!("VCF file {} contains no variants", path.display()));
        }
        if seen_unphased {
            log::warn!(
                "{} contains unphased genotypes; allele order is taken as written",
                path.display()
            );
        }

        Ok(VariantCatalog {
            chromosomes,
            variants,
            nr_paths,
        })
    }

    /// Chromosomes in order of first appearance; output follows this
    /// order regardless of worker completion order.
    pub fn chromosomes(&self) -> &[String] {
        &self.chromosomes
    }

    pub fn variants_of(&self, chromosome: &str) -> Result<&[VariantRecord]> {
        self.variants
            .get(chromosome)
            .map(|v| v.as_slice())
            .ok_or_else(|| format!("Chromosome {} not found in the variant catalogue", chromosome))
    }

    /// Panel size: two paths per sample, identical at every variant.
    pub fn nr_paths(&self) -> usize {
        self.nr_paths
    }

    pub fn nr_variants(&self) -> usize {
        self.variants.values().map(|v| v.len()).sum()
    }
}
