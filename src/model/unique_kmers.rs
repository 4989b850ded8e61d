use crate::model::copy_number::CopyNumber;
use crate::model::kmer_path::{CopyNumberAssignment, KmerPath};
use crate::utils::Result;
use std::collections::BTreeMap;
use std::fmt;

/// Per-variant descriptor of the k-mers that discriminate between alleles.
///
/// Alleles and paths live in ordered maps so that iteration order is the
/// panel order, which keeps the trellis layout and all outputs
/// deterministic. Instances are immutable once handed to the HMM.
#[derive(Debug, Clone)]
pub struct UniqueKmers {
    variant_position: usize,
    current_index: usize,
    kmer_to_copynumber: Vec<CopyNumber>,
    alleles: BTreeMap<u8, KmerPath>,
    path_to_allele: BTreeMap<usize, u8>,
    local_coverage: f64,
}

impl UniqueKmers {
    pub fn new(variant_position: usize) -> UniqueKmers {
        UniqueKmers {
            variant_position,
            current_index: 0,
            kmer_to_copynumber: Vec::new(),
            alleles: BTreeMap::new(),
            path_to_allele: BTreeMap::new(),
            local_coverage: 0.0,
        }
    }

    pub fn get_variant_position(&self) -> usize {
        self.variant_position
    }

    /// Registers an allele with an empty k-mer set. Every allele must be
    /// declared before paths are bound to it or k-mers are assigned to it.
    pub fn insert_empty_allele(&mut self, allele_id: u8) {
        self.alleles.entry(allele_id).or_default();
    }

    /// Binds a panel path to an allele, replacing any previous binding.
    pub fn insert_path(&mut self, path_id: usize, allele_id: u8) {
        self.path_to_allele.insert(path_id, allele_id);
    }

    /// Appends a k-mer with its copy-number likelihoods and marks it
    /// present on each of the listed alleles.
    pub fn insert_kmer(&mut self, copy_number: CopyNumber, alleles: &[u8]) -> Result<()> {
        let index = self.current_index;
        for allele_id in alleles {
            match self.alleles.get_mut(allele_id) {
                Some(path) => path.set(index),
                None => {
                    return Err(format!(
                        "insert_kmer: allele {} was not declared for variant at {}",
                        allele_id, self.variant_position
                    ))
                }
            }
        }
        self.kmer_to_copynumber.push(copy_number);
        self.current_index += 1;
        Ok(())
    }

    pub fn kmer_on_path(&self, kmer_index: usize, path_id: usize) -> Result<bool> {
        let allele_id = self.path_to_allele.get(&path_id).ok_or_else(|| {
            format!("kmer_on_path: path {} does not exist", path_id)
        })?;
        if kmer_index >= self.current_index {
            return Err(format!(
                "kmer_on_path: kmer index {} does not exist",
                kmer_index
            ));
        }
        Ok(self.alleles[allele_id].get(kmer_index) > 0)
    }

    pub fn get_copynumber_of(&self, kmer_index: usize) -> Result<&CopyNumber> {
        self.kmer_to_copynumber.get(kmer_index).ok_or_else(|| {
            format!(
                "get_copynumber_of: kmer index {} does not exist",
                kmer_index
            )
        })
    }

    /// Positional sum of the two alleles' k-mer sets, giving the copy
    /// count each k-mer would have under the genotype (allele_id_1,
    /// allele_id_2).
    pub fn combine_paths(&self, allele_id_1: u8, allele_id_2: u8) -> Result<CopyNumberAssignment> {
        let first = self
            .alleles
            .get(&allele_id_1)
            .ok_or_else(|| format!("combine_paths: allele {} does not exist", allele_id_1))?;
        let second = self
            .alleles
            .get(&allele_id_2)
            .ok_or_else(|| format!("combine_paths: allele {} does not exist", allele_id_2))?;
        Ok(first + second)
    }

    /// Paths with their alleles in panel order. With `only_include`, paths
    /// absent from the filter are skipped.
    pub fn get_path_ids(&self, only_include: Option<&[usize]>) -> (Vec<usize>, Vec<u8>) {
        match only_include {
            Some(filter) => filter
                .iter()
                .filter_map(|p| self.path_to_allele.get(p).map(|a| (*p, *a)))
                .unzip(),
            None => self.path_to_allele.iter().map(|(p, a)| (*p, *a)).unzip(),
        }
    }

    pub fn get_allele_ids(&self) -> Vec<u8> {
        self.alleles.keys().copied().collect()
    }

    pub fn kmers_on_alleles(&self) -> BTreeMap<u8, usize> {
        self.alleles
            .iter()
            .map(|(a, path)| (*a, path.nr_kmers()))
            .collect()
    }

    /// Number of k-mers inserted so far.
    pub fn size(&self) -> usize {
        self.current_index
    }

    pub fn get_nr_paths(&self) -> usize {
        self.path_to_allele.len()
    }

    pub fn set_coverage(&mut self, local_coverage: f64) {
        self.local_coverage = local_coverage;
    }

    pub fn get_coverage(&self) -> f64 {
        self.local_coverage
    }
}

impl fmt::Display for UniqueKmers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UniqueKmers for variant: {}", self.variant_position)?;
        for (i, cn) in self.kmer_to_copynumber.iter().enumerate() {
            writeln!(
                f,
                "{}: {} {} {}",
                i,
                cn.get_probability_of(0),
                cn.get_probability_of(1),
                cn.get_probability_of(2)
            )?;
        }
        writeln!(f, "alleles:")?;
        for (allele_id, path) in &self.alleles {
            writeln!(
                f,
                "{}\t{}",
                allele_id,
                path.convert_to_string(self.current_index)
            )?;
        }
        writeln!(f, "paths:")?;
        for (path_id, allele_id) in &self.path_to_allele {
            writeln!(f, "{} covers allele {}", path_id, allele_id)?;
        }
        Ok(())
    }
}
