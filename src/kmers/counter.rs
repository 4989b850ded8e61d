use crate::kmers::histogram::Histogram;
use crate::kmers::kmer::{canonical_from_seq, CanonicalKmers, MAX_KMER_SIZE};
use crate::utils::{open_sequence_reader, Result};
use bio::io::{fasta, fastq};
use crossbeam_channel::{bounded, Sender};
use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::path::Path;
use std::thread;

const CHANNEL_BUFFER_SIZE: usize = 64;
const BATCH_SIZE: usize = 256;

/// Canonical k-mer counts of one sequence file. A reader thread streams
/// record batches into a bounded channel and a worker pool drains it;
/// the merged map is immutable afterwards and safe to share across
/// chromosome workers.
pub struct KmerCounter {
    k: usize,
    counts: HashMap<u64, u32>,
}

impl KmerCounter {
    pub fn count_file(path: &Path, k: usize, threads: usize) -> Result<KmerCounter> {
        if k == 0 || k > MAX_KMER_SIZE {
            return Err(format!(
                "kmer size must be between 1 and {}, got {}",
                MAX_KMER_SIZE, k
            ));
        }

        let (sender, receiver) = bounded::<Vec<Vec<u8>>>(CHANNEL_BUFFER_SIZE);
        let reader_path = path.to_path_buf();
        let reader_thread =
            thread::spawn(move || stream_sequences_into_channel(&reader_path, sender));

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("kmer-count-{}", i))
            .build()
            .map_err(|e| format!("Failed to initialize thread pool: {}", e))?;
        let counts = pool.install(|| {
            receiver
                .into_iter()
                .par_bridge()
                .fold(HashMap::new, |mut map: HashMap<u64, u32>, batch| {
                    for seq in &batch {
                        for kmer in CanonicalKmers::new(seq, k) {
                            *map.entry(kmer).or_insert(0) += 1;
                        }
                    }
                    map
                })
                .reduce(HashMap::new, |mut merged, map| {
                    for (kmer, count) in map {
                        *merged.entry(kmer).or_insert(0) += count;
                    }
                    merged
                })
        });

        reader_thread
            .join()
            .map_err(|_| "Sequence reader thread panicked".to_string())??;
        Ok(KmerCounter { k, counts })
    }

    pub fn count_sequences<'a>(
        sequences: impl IntoIterator<Item = &'a [u8]>,
        k: usize,
    ) -> Result<KmerCounter> {
        if k == 0 || k > MAX_KMER_SIZE {
            return Err(format!(
                "kmer size must be between 1 and {}, got {}",
                MAX_KMER_SIZE, k
            ));
        }
        let mut counts = HashMap::new();
        for seq in sequences {
            for kmer in CanonicalKmers::new(seq, k) {
                *counts.entry(kmer).or_insert(0) += 1;
            }
        }
        Ok(KmerCounter { k, counts })
    }

    pub fn kmer_size(&self) -> usize {
        self.k
    }

    pub fn get_count(&self, kmer: u64) -> u32 {
        self.counts.get(&kmer).copied().unwrap_or(0)
    }

    /// Count of the canonical form of a spelled-out k-mer; sequences with
    /// ambiguous bases have count 0.
    pub fn get_count_of_seq(&self, seq: &[u8]) -> u32 {
        debug_assert_eq!(seq.len(), self.k);
        canonical_from_seq(seq)
            .map(|kmer| self.get_count(kmer))
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.counts.iter().map(|(kmer, count)| (*kmer, *count))
    }

    pub fn nr_distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn histogram(&self, max_value: usize) -> Histogram {
        let mut histogram = Histogram::new(max_value);
        for count in self.counts.values() {
            histogram.add(*count as usize);
        }
        histogram
    }

    /// Writes the abundance histogram and returns the detected peak.
    pub fn compute_histogram(&self, max_value: usize, path: &Path) -> Result<Option<usize>> {
        let histogram = self.histogram(max_value);
        histogram.write_to_file(path)?;
        Ok(histogram.find_peak())
    }
}

fn is_fastq(path: &Path) -> bool {
    let mut name = path.to_string_lossy().to_lowercase();
    for suffix in [".gz", ".gzip"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
            break;
        }
    }
    name.ends_with(".fq") || name.ends_with(".fastq")
}

fn stream_sequences_into_channel(path: &Path, sender: Sender<Vec<Vec<u8>>>) -> Result<()> {
    let reader = open_sequence_reader(path)?;
    let mut batch: Vec<Vec<u8>> = Vec::with_capacity(BATCH_SIZE);
    if is_fastq(path) {
        for record in fastq::Reader::new(reader).records() {
            let record = record
                .map_err(|e| format!("Failed to parse FASTQ record in {}: {}", path.display(), e))?;
            batch.push(record.seq().to_vec());
            if batch.len() >= BATCH_SIZE {
                send_batch(&sender, &mut batch)?;
            }
        }
    } else {
        for record in fasta::Reader::new(reader).records() {
            let record = record
                .map_err(|e| format!("Failed to parse FASTA record in {}: {}", path.display(), e))?;
            batch.push(record.seq().to_vec());
            if batch.len() >= BATCH_SIZE {
                send_batch(&sender, &mut batch)?;
            }
        }
    }
    send_batch(&sender, &mut batch)
}

fn send_batch(sender: &Sender<Vec<Vec<u8>>>, batch: &mut Vec<Vec<u8>>) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    sender
        .send(std::mem::take(batch))
        .map_err(|_| "K-mer counting workers hung up".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmers::kmer::decode;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Write;

    fn write_fasta(dir: &tempfile::TempDir, name: &str, seqs: &[&[u8]]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for (i, seq) in seqs.iter().enumerate() {
            writeln!(file, ">seq{}", i).unwrap();
            file.write_all(seq).unwrap();
            writeln!(file).unwrap();
        }
        path
    }

    fn random_sequence(rng: &mut StdRng, length: usize) -> Vec<u8> {
        (0..length).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
    }

    #[test]
    fn test_counts_both_strands_together() {
        let counter = KmerCounter::count_sequences([&b"ACGTT"[..], &b"AACGT"[..]], 5).unwrap();
        // AACGT is the reverse complement of ACGTT.
        assert_eq!(counter.get_count_of_seq(b"ACGTT"), 2);
        assert_eq!(counter.get_count_of_seq(b"AACGT"), 2);
        assert_eq!(counter.nr_distinct(), 1);
    }

    #[test]
    fn test_count_fasta_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(&dir, "reads.fa", &[b"ACGTACGT", b"ACGTACGT"]);
        let counter = KmerCounter::count_file(&path, 4, 1).unwrap();
        // Each read contributes ACGT twice; CGTA and TACG are canonical
        // equals and contribute twice per read together.
        assert_eq!(counter.get_count_of_seq(b"ACGT"), 4);
        assert_eq!(counter.get_count_of_seq(b"CGTA"), 4);
    }

    #[test]
    fn test_count_fastq_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fastq");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "@read1\nACGTAC\n+\nIIIIII").unwrap();
        let counter = KmerCounter::count_file(&path, 3, 1).unwrap();
        assert_eq!(counter.get_count_of_seq(b"ACG"), 2);
    }

    #[test]
    fn test_parallel_counting_matches_serial() {
        let mut rng = StdRng::seed_from_u64(7);
        let seqs: Vec<Vec<u8>> = (0..2000).map(|_| random_sequence(&mut rng, 80)).collect();
        let refs: Vec<&[u8]> = seqs.iter().map(|s| s.as_slice()).collect();

        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(&dir, "reads.fa", &refs);

        let serial = KmerCounter::count_sequences(refs.iter().copied(), 11).unwrap();
        let parallel = KmerCounter::count_file(&path, 11, 4).unwrap();

        assert_eq!(serial.nr_distinct(), parallel.nr_distinct());
        for (kmer, count) in serial.iter() {
            assert_eq!(
                parallel.get_count(kmer),
                count,
                "count mismatch for {}",
                decode(kmer, 11)
            );
        }
    }

    #[test]
    fn test_invalid_kmer_size() {
        assert!(KmerCounter::count_sequences([&b"ACGT"[..]], 0).is_err());
        assert!(KmerCounter::count_sequences([&b"ACGT"[..]], 32).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(KmerCounter::count_file(Path::new("/no/such/reads.fa"), 5, 1).is_err());
    }

    #[test]
    fn test_histogram_of_counts() {
        let counter =
            KmerCounter::count_sequences([&b"AAAAC"[..], &b"AAAAC"[..], &b"TTGCA"[..]], 5)
                .unwrap();
        let histogram = counter.histogram(10);
        assert_eq!(histogram.get(2), 1);
        assert_eq!(histogram.get(1), 1);
    }
}
