use crate::utils::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Abundance histogram of k-mer counts. Counts beyond the configured
/// maximum are clamped into the last bucket.
#[derive(Debug, Clone)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    pub fn new(max_value: usize) -> Histogram {
        Histogram {
            counts: vec![0; max_value + 1],
        }
    }

    pub fn add(&mut self, value: usize) {
        let index = value.min(self.counts.len() - 1);
        self.counts[index] += 1;
    }

    pub fn get(&self, value: usize) -> u64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        let mut writer = BufWriter::new(file);
        for (value, count) in self.counts.iter().enumerate() {
            writeln!(writer, "{}\t{}", value, count)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        }
        Ok(())
    }

    /// The abundance peak: low counts are dominated by sequencing errors,
    /// so the initial downslope is followed to its valley and the maximum
    /// after the valley is returned. None when no mass remains there.
    pub fn find_peak(&self) -> Option<usize> {
        let mut valley = 1;
        while valley + 1 < self.counts.len() && self.counts[valley + 1] <= self.counts[valley] {
            valley += 1;
        }
        let (peak, count) = self
            .counts
            .iter()
            .enumerate()
            .skip(valley + 1)
            .max_by_key(|(_, count)| **count)?;
        if *count > 0 {
            Some(peak)
        } else {
            None
        }
    }
}
