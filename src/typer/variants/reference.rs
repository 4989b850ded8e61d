use crate::utils::{open_sequence_reader, Result};
use bio::io::fasta;
use std::collections::HashMap;
use std::path::Path;

/// The reference genome, loaded fully into memory with all bases
/// uppercased. Immutable after loading and shared read-only across the
/// chromosome workers.
pub struct Reference {
    chromosomes: HashMap<String, Vec<u8>>,
}

impl Reference {
    pub fn from_fasta(path: &Path) -> Result<Reference> {
        let reader = open_sequence_reader(path)?;
        let mut chromosomes = HashMap::new();
        for record in fasta::Reader::new(reader).records() {
            let record = record
                .map_err(|e| format!("Failed to parse FASTA record in {}: {}", path.display(), e))?;
            let name = record.id().to_string();
            if chromosomes
                .insert(name.clone(), record.seq().to_ascii_uppercase())
                .is_some()
            {
                return Err(format!(
                    "Duplicate sequence {} in {}",
                    name,
                    path.display()
                ));
            }
        }
        if chromosomes.is_empty() {
            return Err(format!("No sequences found in {}", path.display()));
        }
        Ok(Reference { chromosomes })
    }

    pub fn chromosome(&self, name: &str) -> Result<&[u8]> {
        self.chromosomes
            .get(name)
            .map(|seq| seq.as_slice())
            .ok_or_else(|| format!("Chromosome {} not found in the reference", name))
    }

    pub fn length_of(&self, name: &str) -> Result<usize> {
        self.chromosome(name).map(|seq| seq.len())
    }
}
