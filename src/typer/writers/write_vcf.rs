use crate::model::GenotypingResult;
use crate::typer::variants::VariantRecord;
use crate::utils::Result;
use rust_htslib::bcf::{self, record::GenotypeAllele, Format};
use std::env;
use std::path::Path;

/// FORMAT lines of the genotyping output.
const GENOTYPING_FORMAT_LINES: [&str; 3] = [
    r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
    r#"##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype quality: phred scaled probability that the genotype is wrong">"#,
    r#"##FORMAT=<ID=GL,Number=G,Type=Float,Description="Log10-scaled likelihoods for genotypes 0/0, 0/1, 1/1, ...">"#,
];

/// FORMAT lines of the phasing output.
const PHASING_FORMAT_LINES: [&str; 1] =
    [r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Phased genotype">"#];

/// Writes genotyping or phasing results as VCF records, one sample, in
/// the caller's chromosome order.
pub struct VcfWriter {
    writer: bcf::Writer,
    phased: bool,
}

impl VcfWriter {
    /// Posterior-based output: unphased MAP genotype with GQ and GL.
    pub fn genotyping(
        path: &Path,
        sample_name: &str,
        contigs: &[(String, usize)],
    ) -> Result<VcfWriter> {
        VcfWriter::new(path, sample_name, contigs, false)
    }

    /// Viterbi-based output: phased genotype only.
    pub fn phasing(
        path: &Path,
        sample_name: &str,
        contigs: &[(String, usize)],
    ) -> Result<VcfWriter> {
        VcfWriter::new(path, sample_name, contigs, true)
    }

    fn new(
        path: &Path,
        sample_name: &str,
        contigs: &[(String, usize)],
        phased: bool,
    ) -> Result<VcfWriter> {
        let mut vcf_header = bcf::header::Header::new();

        let format_lines: &[&str] = if phased {
            &PHASING_FORMAT_LINES
        } else {
            &GENOTYPING_FORMAT_LINES
        };
        for line in format_lines {
            vcf_header.push_record(line.as_bytes());
        }
        for (name, length) in contigs {
            let contig_line = format!(r#"##contig=<ID={},length={}>"#, name, length);
            vcf_header.push_record(contig_line.as_bytes());
        }

        let line = format!(
            "##{}Version={}",
            env!("CARGO_PKG_NAME"),
            *crate::cli::FULL_VERSION
        );
        vcf_header.push_record(line.as_bytes());

        let args: Vec<String> = env::args().collect();
        let line = format!("##{}Command={}", env!("CARGO_PKG_NAME"), args.join(" "));
        vcf_header.push_record(line.as_bytes());

        vcf_header.push_sample(sample_name.as_bytes());

        let writer = bcf::Writer::from_path(path, &vcf_header, true, Format::Vcf)
            .map_err(|_| format!("Invalid VCF output path: {}", path.display()))?;
        Ok(VcfWriter { writer, phased })
    }

    /// Writes one record per variant; `results` must parallel `variants`.
    pub fn write_chromosome(
        &mut self,
        chromosome: &str,
        variants: &[VariantRecord],
        results: &[GenotypingResult],
    ) -> Result<()> {
        if variants.len() != results.len() {
            return Err(format!(
                "{}: {} variants but {} genotyping results",
                chromosome,
                variants.len(),
                results.len()
            ));
        }
        let rid = self
            .writer
            .header()
            .name2rid(chromosome.as_bytes())
            .map_err(|_| format!("Chromosome {} missing from the output header", chromosome))?;

        for (variant, result) in variants.iter().zip(results) {
            let mut record = self.writer.empty_record();
            record.set_rid(Some(rid));
            record.set_pos(variant.position() as i64);
            let alleles: Vec<&[u8]> = (0..variant.nr_alleles())
                .filter_map(|a| variant.allele(a as u8))
                .collect();
            record
                .set_alleles(&alleles)
                .map_err(|e| format!("Failed to set alleles: {}", e))?;

            if self.phased {
                let genotype = match result.get_haplotype() {
                    Some((allele_1, allele_2)) => [
                        GenotypeAllele::Unphased(allele_1 as i32),
                        GenotypeAllele::Phased(allele_2 as i32),
                    ],
                    None => [
                        GenotypeAllele::UnphasedMissing,
                        GenotypeAllele::PhasedMissing,
                    ],
                };
                record
                    .push_genotypes(&genotype)
                    .map_err(|e| format!("Failed to write genotype: {}", e))?;
            } else {
                let (genotype, quality) = match result.get_likeliest_genotype() {
                    Some((allele_1, allele_2)) => (
                        [
                            GenotypeAllele::Unphased(allele_1 as i32),
                            GenotypeAllele::Unphased(allele_2 as i32),
                        ],
                        result.get_genotype_quality(allele_1, allele_2) as i32,
                    ),
                    None => (
                        [
                            GenotypeAllele::UnphasedMissing,
                            GenotypeAllele::UnphasedMissing,
                        ],
                        0,
                    ),
                };
                record
                    .push_genotypes(&genotype)
                    .map_err(|e| format!("Failed to write genotype: {}", e))?;
                record
                    .push_format_integer(b"GQ", &[quality])
                    .map_err(|e| format!("Failed to write GQ: {}", e))?;
                let likelihoods: Vec<f32> = result
                    .get_all_likelihoods(variant.nr_alleles())
                    .iter()
                    .map(|v| *v as f32)
                    .collect();
                record
                    .push_format_float(b"GL", &likelihoods)
                    .map_err(|e| format!("Failed to write GL: {}", e))?;
            }

            self.writer
                .write(&record)
                .map_err(|e| format!("Failed to write VCF record: {}", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bcf::Read;

    fn test_variants() -> Vec<VariantRecord> {
        vec![
            VariantRecord::new(9, vec![b"A".to_vec(), b"T".to_vec()], vec![0, 1]),
            VariantRecord::new(49, vec![b"GA".to_vec(), b"G".to_vec()], vec![0, 0]),
        ]
    }

    fn contigs() -> Vec<(String, usize)> {
        vec![("chr1".to_string(), 1000)]
    }

    #[test]
    fn test_write_genotyping_vcf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_genotyping.vcf");

        let mut het = GenotypingResult::new();
        het.add_to_likelihood(0, 1, 0.99);
        het.add_to_likelihood(0, 0, 0.01);
        let empty = GenotypingResult::new();

        let mut writer = VcfWriter::genotyping(&path, "sample", &contigs()).unwrap();
        writer
            .write_chromosome("chr1", &test_variants(), &[het, empty])
            .unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("##FORMAT=<ID=GL"));
        assert!(contents.contains("\tsample\n"));

        let mut reader = bcf::Reader::from_path(&path).unwrap();
        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pos(), 9);

        let genotypes = records[0].genotypes().unwrap();
        let genotype: Vec<GenotypeAllele> = genotypes.get(0).iter().copied().collect();
        assert_eq!(
            genotype,
            vec![GenotypeAllele::Unphased(0), GenotypeAllele::Unphased(1)]
        );
        let quality = records[0].format(b"GQ").integer().unwrap()[0][0];
        assert_eq!(quality, 20);

        // No posterior: missing genotype.
        let genotypes = records[1].genotypes().unwrap();
        let genotype: Vec<GenotypeAllele> = genotypes.get(0).iter().copied().collect();
        assert_eq!(genotype[0], GenotypeAllele::UnphasedMissing);
    }

    #[test]
    fn test_write_phasing_vcf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_phasing.vcf");

        let mut phased = GenotypingResult::new();
        phased.set_haplotype(1, 0);
        let unphased = GenotypingResult::new();

        let mut writer = VcfWriter::phasing(&path, "sample", &contigs()).unwrap();
        writer
            .write_chromosome("chr1", &test_variants(), &[phased, unphased])
            .unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines().filter(|l| !l.starts_with('#'));
        let first = lines.next().unwrap();
        assert!(first.ends_with("1|0"));
        let second = lines.next().unwrap();
        assert!(second.ends_with(".|."));
    }

    #[test]
    fn test_mismatched_result_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vcf");
        let mut writer = VcfWriter::genotyping(&path, "sample", &contigs()).unwrap();
        let err = writer
            .write_chromosome("chr1", &test_variants(), &[])
            .unwrap_err();
        assert!(err.contains("genotyping results"));
    }

    #[test]
    fn test_unknown_chromosome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vcf");
        let mut writer = VcfWriter::genotyping(&path, "sample", &contigs()).unwrap();
        let err = writer.write_chromosome("chr9", &[], &[]).unwrap_err();
        assert!(err.contains("chr9"));
    }
}
