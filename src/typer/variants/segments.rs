use crate::typer::variants::{Reference, VariantCatalog, VariantRecord};
use crate::utils::Result;
use bio::io::fasta;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// The allele sequence with k-1 reference bases of flank on both sides,
/// clamped at the chromosome boundaries. K-mers overlapping the variant
/// are fully contained in one of these segments.
pub fn allele_segment(
    reference_seq: &[u8],
    variant: &VariantRecord,
    allele_id: u8,
    k: usize,
) -> Result<Vec<u8>> {
    let allele = variant.allele(allele_id).ok_or_else(|| {
        format!(
            "Variant at position {} has no allele {}",
            variant.position(),
            allele_id
        )
    })?;
    if variant.end() > reference_seq.len() {
        return Err(format!(
            "Variant at position {} extends beyond the chromosome",
            variant.position() + 1
        ));
    }
    let flank = k - 1;
    let left_start = variant.position().saturating_sub(flank);
    let right_end = (variant.end() + flank).min(reference_seq.len());

    let mut segment =
        Vec::with_capacity(variant.position() - left_start + allele.len() + right_end - variant.end());
    segment.extend_from_slice(&reference_seq[left_start..variant.position()]);
    segment.extend_from_slice(allele);
    segment.extend_from_slice(&reference_seq[variant.end()..right_end]);
    Ok(segment)
}

/// All segments of one chromosome: the reference pieces between
/// consecutive variants and one flanked segment per allele. Together
/// they cover every k-mer of every panel path exactly once, so counting
/// them yields the genomic multiplicity used for uniqueness checks.
pub fn chromosome_segments(
    chromosome: &str,
    variants: &[VariantRecord],
    reference_seq: &[u8],
    k: usize,
) -> Result<Vec<(String, Vec<u8>)>> {
    let mut segments = Vec::new();
    let mut previous_end = 0;
    for variant in variants {
        if variant.end() > reference_seq.len() {
            return Err(format!(
                "{}:{}: variant extends beyond the chromosome",
                chromosome,
                variant.position() + 1
            ));
        }
        if variant.reference_allele() != &reference_seq[variant.position()..variant.end()] {
            return Err(format!(
                "{}:{}: reference allele does not match the reference sequence",
                chromosome,
                variant.position() + 1
            ));
        }
        if previous_end < variant.position() {
            segments.push((
                format!("{}_ref_{}", chromosome, previous_end),
                reference_seq[previous_end..variant.position()].to_vec(),
            ));
        }
        for allele_id in 0..variant.nr_alleles() as u8 {
            segments.push((
                format!("{}_{}_{}", chromosome, variant.position(), allele_id),
                allele_segment(reference_seq, variant, allele_id, k)?,
            ));
        }
        previous_end = variant.end();
    }
    if previous_end < reference_seq.len() {
        segments.push((
            format!("{}_ref_{}", chromosome, previous_end),
            reference_seq[previous_end..].to_vec(),
        ));
    }
    Ok(segments)
}

/// Writes the path segments of all chromosomes to a FASTA file; this is
/// the sequence set the genomic k-mer counts are taken from.
pub fn write_path_segments(
    catalog: &VariantCatalog,
    reference: &Reference,
    k: usize,
    path: &Path,
) -> Result<()> {
    let file =
        File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    let mut writer = fasta::Writer::new(BufWriter::new(file));
    for chromosome in catalog.chromosomes() {
        let reference_seq = reference.chromosome(chromosome)?;
        let variants = catalog.variants_of(chromosome)?;
        for (id, segment) in chromosome_segments(chromosome, variants, reference_seq, k)? {
            writer
                .write(&id, None, &segment)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snp(position: usize, reference: u8, alternative: u8) -> VariantRecord {
        VariantRecord::new(
            position,
            vec![vec![reference], vec![alternative]],
            vec![0, 1],
        )
    }

    #[test]
    fn test_allele_segment_with_flanks() {
        //                0123456789
        let reference = b"AAACGTACCC";
        let variant = snp(4, b'G', b'C');
        assert_eq!(
            allele_segment(reference, &variant, 0, 4).unwrap(),
            b"AACGTAC".to_vec()
        );
        assert_eq!(
            allele_segment(reference, &variant, 1, 4).unwrap(),
            b"AACCTAC".to_vec()
        );
    }

    #[test]
    fn test_allele_segment_clamps_at_boundaries() {
        let reference = b"ACGT";
        let variant = snp(0, b'A', b'T');
        assert_eq!(
            allele_segment(reference, &variant, 1, 4).unwrap(),
            b"TCGT".to_vec()
        );
    }

    #[test]
    fn test_chromosome_segments_tile_the_reference() {
        let reference = b"AAACGTACCCGGGTTT";
        let variants = vec![snp(4, b'G', b'C'), snp(10, b'G', b'T')];
        let segments = chromosome_segments("chr1", &variants, reference, 3).unwrap();

        let ids: Vec<&str> = segments.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "chr1_ref_0",
                "chr1_4_0",
                "chr1_4_1",
                "chr1_ref_5",
                "chr1_10_0",
                "chr1_10_1",
                "chr1_ref_11"
            ]
        );
        // Reference pieces stop right before each variant.
        assert_eq!(segments[0].1, b"AAAC".to_vec());
        assert_eq!(segments[3].1, b"TACCC".to_vec());
        assert_eq!(segments[6].1, b"GGTTT".to_vec());
        // Allele segments carry k-1 flanks.
        assert_eq!(segments[1].1, b"ACGTA".to_vec());
        assert_eq!(segments[2].1, b"ACCTA".to_vec());
    }

    #[test]
    fn test_reference_allele_mismatch_is_an_error() {
        let reference = b"AAAAAA";
        let variants = vec![snp(2, b'C', b'T')];
        let err = chromosome_segments("chr1", &variants, reference, 3).unwrap_err();
        assert!(err.contains("does not match"));
    }

    #[test]
    fn test_variant_beyond_chromosome_is_an_error() {
        let reference = b"AAAA";
        let variants = vec![snp(10, b'A', b'T')];
        assert!(chromosome_segments("chr1", &variants, reference, 3).is_err());
    }
}
