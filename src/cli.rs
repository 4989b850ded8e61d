use crate::kmers::kmer::MAX_KMER_SIZE;
use crate::utils::Result;
use clap::{ArgAction, Parser};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| env!("CARGO_PKG_VERSION").to_string());

#[derive(Parser, Debug)]
#[command(name = "pantype",
          version = &**FULL_VERSION,
          about = "Genotyping and phasing based on k-mer counting and known haplotype sequences",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}")]
pub struct Cli {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "reads")]
    #[clap(help = "Sequencing reads in FASTA/FASTQ format (may be gzipped)")]
    #[clap(value_name = "READS")]
    #[arg(value_parser = check_file_exists)]
    pub reads_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(help = "Reference genome in FASTA format")]
    #[clap(value_name = "FASTA")]
    #[arg(value_parser = check_file_exists)]
    pub reference_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'v')]
    #[clap(long = "vcf")]
    #[clap(help = "Variant panel in VCF format with phased haplotype samples")]
    #[clap(value_name = "VCF")]
    #[arg(value_parser = check_file_exists)]
    pub vcf_path: PathBuf,

    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for the output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[clap(default_value = "result")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 'k')]
    #[clap(long = "kmer-size")]
    #[clap(help = "K-mer size")]
    #[clap(value_name = "KMER_SIZE")]
    #[clap(default_value = "31")]
    #[arg(value_parser = kmer_size_in_range)]
    pub kmer_size: usize,

    #[clap(short = 's')]
    #[clap(long = "sample-name")]
    #[clap(help = "Name of the sample used in the output VCFs")]
    #[clap(value_name = "SAMPLE_NAME")]
    #[clap(default_value = "sample")]
    #[arg(value_parser = check_sample_name_nonempty)]
    pub sample_name: String,

    #[clap(short = 'j')]
    #[clap(long = "kmer-threads")]
    #[clap(help = "Number of threads used for k-mer counting")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub kmer_threads: usize,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of chromosome worker threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(short = 'n')]
    #[clap(long = "effective-population-size")]
    #[clap(help = "Effective population size of the recombination model")]
    #[clap(value_name = "EFFECTIVE_N")]
    #[clap(default_value = "25000")]
    pub effective_n: f64,

    #[clap(short = 'm')]
    #[clap(long = "small-kmer-size")]
    #[clap(help = "Small k-mer size of the count correction covariate model")]
    #[clap(value_name = "SMALL_KMER_SIZE")]
    #[clap(default_value = "5")]
    #[arg(value_parser = kmer_size_in_range)]
    pub small_kmer_size: usize,

    #[clap(short = 'g')]
    #[clap(long = "only-genotyping")]
    #[clap(help = "Only run genotyping (Forward-Backward algorithm)")]
    #[clap(conflicts_with = "only_phasing")]
    pub only_genotyping: bool,

    #[clap(short = 'p')]
    #[clap(long = "only-phasing")]
    #[clap(help = "Only run phasing (Viterbi algorithm)")]
    pub only_phasing: bool,

    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., --verbose --verbose for more verbosity)")]
    pub verbosity: u8,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn kmer_size_in_range(s: &str) -> Result<usize> {
    let size: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid k-mer size", s))?;
    if (1..=MAX_KMER_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(format!(
            "K-mer size must be between 1 and {}",
            MAX_KMER_SIZE
        ))
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_sample_name_nonempty(s: &str) -> Result<String> {
    if s.trim().is_empty() {
        Err("Sample name cannot be an empty string".to_string())
    } else {
        Ok(s.to_string())
    }
}
