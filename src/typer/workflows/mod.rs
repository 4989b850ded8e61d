//! Per-chromosome genotyping workflows and the worker pool that runs
//! them.

mod chromosome;
mod unique_kmers;

pub use chromosome::{analyze_chromosome, WorkflowParams};
pub use unique_kmers::build_unique_kmers;

use crate::utils::Result;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::ThreadPoolBuilder;

/// Runs one job per chromosome on a fixed-size worker pool. Results come
/// back in the declared chromosome order regardless of completion order,
/// so the caller can flush output serially after the join. All jobs run
/// to completion even when one fails; the first error (in declared
/// order) propagates afterwards and drops the remaining results.
pub fn run_on_worker_pool<T, F>(
    chromosomes: &[String],
    threads: usize,
    job: F,
) -> Result<Vec<(String, T)>>
where
    T: Send,
    F: Fn(&str) -> Result<T> + Sync,
{
    let nr_workers = threads.max(1).min(chromosomes.len().max(1));
    let pool = ThreadPoolBuilder::new()
        .num_threads(nr_workers)
        .thread_name(|i| format!("chromosome-{}", i))
        .build()
        .map_err(|e| format!("Failed to initialize worker pool: {}", e))?;

    let results: Vec<Result<T>> =
        pool.install(|| chromosomes.par_iter().map(|chromosome| job(chromosome)).collect());

    let mut output = Vec::with_capacity(results.len());
    for (chromosome, result) in chromosomes.iter().zip(results) {
        match result {
            Ok(value) => output.push((chromosome.clone(), value)),
            Err(e) => return Err(format!("Processing {} failed: {}", chromosome, e)),
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_results_follow_declared_order() {
        let chromosomes: Vec<String> =
            (0..6).map(|i| format!("chr{}", i + 1)).collect();
        // Later chromosomes finish first.
        let results = run_on_worker_pool(&chromosomes, 3, |chromosome| {
            let index: u64 = chromosome.strip_prefix("chr").unwrap().parse().unwrap();
            thread::sleep(Duration::from_millis((7 - index) * 10));
            Ok(index)
        })
        .unwrap();

        let names: Vec<&str> = results.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["chr1", "chr2", "chr3", "chr4", "chr5", "chr6"]);
        let values: Vec<u64> = results.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_worker_failure_propagates_after_join() {
        let chromosomes: Vec<String> = vec!["chr1".into(), "chr2".into(), "chr3".into()];
        let err = run_on_worker_pool(&chromosomes, 2, |chromosome| {
            if chromosome == "chr2" {
                Err("bad panel".to_string())
            } else {
                Ok(chromosome.len())
            }
        })
        .unwrap_err();
        assert!(err.contains("chr2"));
        assert!(err.contains("bad panel"));
    }

    #[test]
    fn test_single_worker_pool() {
        let chromosomes: Vec<String> = vec!["chrX".into()];
        let results = run_on_worker_pool(&chromosomes, 8, |c| Ok(c.to_uppercase())).unwrap();
        assert_eq!(results, vec![("chrX".to_string(), "CHRX".to_string())]);
    }
}
