use crate::cli::Cli;
use crate::kmers::{
    CountCorrector, KmerCounter, ReadKmerCounts, DEFAULT_TRAINING_FRACTION,
};
use crate::typer::variants::{write_path_segments, Reference, VariantCatalog};
use crate::typer::workflows::{analyze_chromosome, run_on_worker_pool, WorkflowParams};
use crate::typer::writers::VcfWriter;
use crate::utils::Result;
use std::path::PathBuf;

/// Histograms are tracked up to this count; everything above lands in
/// the last bucket.
const HISTOGRAM_MAX: usize = 10000;

/// The full genotyping/phasing pipeline: read inputs, count and correct
/// k-mers, run the per-chromosome workers, and write the output VCFs in
/// declared chromosome order.
pub fn run(args: Cli) -> Result<()> {
    let run_genotyping = !args.only_phasing;
    let run_phasing = !args.only_genotyping;

    log::info!("Determine allele sequences");
    let reference = Reference::from_fasta(&args.reference_path)?;
    let catalog = VariantCatalog::from_vcf(&args.vcf_path)?;
    log::info!(
        "Found {} chromosome(s) with {} variant(s) and a panel of {} paths",
        catalog.chromosomes().len(),
        catalog.nr_variants(),
        catalog.nr_paths()
    );

    let segments_path = output_path(&args.output_prefix, "path_segments.fasta");
    log::info!("Write path segments to {}", segments_path.display());
    write_path_segments(&catalog, &reference, args.kmer_size, &segments_path)?;

    log::info!("Count kmers in reads");
    let read_counter =
        KmerCounter::count_file(&args.reads_path, args.kmer_size, args.kmer_threads)?;
    let peak = read_counter
        .compute_histogram(
            HISTOGRAM_MAX,
            &output_path(&args.output_prefix, "histogram.histo"),
        )?
        .ok_or("Could not determine a k-mer abundance peak from the reads")?;
    log::info!("Computed k-mer abundance peak: {}", peak);

    log::info!("Count kmers in genome");
    let genomic_counts =
        KmerCounter::count_file(&segments_path, args.kmer_size, args.kmer_threads)?;

    log::info!("Correct read k-mer counts");
    let corrector = CountCorrector::train(
        &read_counter,
        &genomic_counts,
        args.small_kmer_size,
        DEFAULT_TRAINING_FRACTION,
    );
    let read_counts = ReadKmerCounts::new(read_counter, corrector);
    let corrected_peak = read_counts
        .compute_corrected_histogram(
            HISTOGRAM_MAX,
            &output_path(&args.output_prefix, "corrected-histogram.histo"),
        )?
        .unwrap_or(peak);
    log::info!("Computed corrected k-mer abundance peak: {}", corrected_peak);

    let workflow_params = WorkflowParams {
        run_genotyping,
        run_phasing,
        effective_n: args.effective_n,
        peak: corrected_peak,
    };

    let chromosomes = catalog.chromosomes().to_vec();
    log::info!(
        "Process {} chromosome(s) on {} worker(s)",
        chromosomes.len(),
        args.num_threads.min(chromosomes.len())
    );
    let results = run_on_worker_pool(&chromosomes, args.num_threads, |chromosome| {
        log::info!("Processing chromosome {}", chromosome);
        analyze_chromosome(
            chromosome,
            catalog.variants_of(chromosome)?,
            reference.chromosome(chromosome)?,
            &genomic_counts,
            &read_counts,
            &workflow_params,
        )
    })?;

    let contigs: Vec<(String, usize)> = chromosomes
        .iter()
        .map(|chromosome| Ok((chromosome.clone(), reference.length_of(chromosome)?)))
        .collect::<Result<_>>()?;

    if run_genotyping {
        let path = output_path(&args.output_prefix, "genotyping.vcf");
        log::info!("Write genotyping output to {}", path.display());
        let mut writer = VcfWriter::genotyping(&path, &args.sample_name, &contigs)?;
        for (chromosome, chromosome_results) in &results {
            writer.write_chromosome(
                chromosome,
                catalog.variants_of(chromosome)?,
                chromosome_results,
            )?;
        }
    }
    if run_phasing {
        let path = output_path(&args.output_prefix, "phasing.vcf");
        log::info!("Write phasing output to {}", path.display());
        let mut writer = VcfWriter::phasing(&path, &args.sample_name, &contigs)?;
        for (chromosome, chromosome_results) in &results {
            writer.write_chromosome(
                chromosome,
                catalog.variants_of(chromosome)?,
                chromosome_results,
            )?;
        }
    }

    Ok(())
}

fn output_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}", prefix, suffix))
}
