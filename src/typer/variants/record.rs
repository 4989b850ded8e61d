/// One catalogued variant: its position, allele sequences (reference
/// first) and the allele carried by each panel path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    position: usize,
    alleles: Vec<Vec<u8>>,
    path_to_allele: Vec<u8>,
}

impl VariantRecord {
    pub fn new(position: usize, alleles: Vec<Vec<u8>>, path_to_allele: Vec<u8>) -> VariantRecord {
        VariantRecord {
            position,
            alleles,
            path_to_allele,
        }
    }

    /// 0-based start on the chromosome.
    pub fn position(&self) -> usize {
        self.position
    }

    /// 0-based position one past the reference allele.
    pub fn end(&self) -> usize {
        self.position + self.alleles[0].len()
    }

    pub fn nr_alleles(&self) -> usize {
        self.alleles.len()
    }

    pub fn allele(&self, allele_id: u8) -> Option<&[u8]> {
        self.alleles.get(allele_id as usize).map(|a| a.as_slice())
    }

    pub fn reference_allele(&self) -> &[u8] {
        &self.alleles[0]
    }

    pub fn nr_paths(&self) -> usize {
        self.path_to_allele.len()
    }

    /// Allele per panel path, in panel order.
    pub fn path_alleles(&self) -> &[u8] {
        &self.path_to_allele
    }
}
