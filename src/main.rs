//! genorange: genome range trees and indel placement
//!
//! Usage: genorange <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use genorange::error::{Error, Result};
use genorange::indel_shift::{indel_shift, ShiftDirection};
use genorange::parallel::{build_genome_tree, map_chromosomes};
use genorange::range_file::{file_and, file_or, RangeFile};
use genorange::seq_window::{SeqWindow, TwoBitFile};
use genorange::{bed, GenomeRangeTree, INDEL_SHIFT_NO_MAX};

#[derive(Parser)]
#[command(name = "genorange")]
#[command(version)]
#[command(about = "Genome range trees, base masks and indel placement", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the bases covered by one file, or by the union of two, as a
    /// range file
    BaseMask {
        /// First input (BED if it ends in .bed, range file otherwise)
        input1: PathBuf,

        /// Optional second input
        input2: Option<PathBuf>,

        /// Output range file
        #[arg(short, long)]
        output: PathBuf,

        /// Intersect instead of union (not supported for range files)
        #[arg(long = "and")]
        and: bool,

        /// Do not print the coverage summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Report covered bases per sequence and in total
    Coverage {
        /// Input (BED if it ends in .bed, range file otherwise)
        input: PathBuf,
    },

    /// Report the number of bases covered by both inputs
    IntersectSize {
        /// First input
        a: PathBuf,

        /// Second input
        b: PathBuf,
    },

    /// Move an insertion or deletion to its leftmost or rightmost
    /// equivalent position
    Shift {
        /// Genome in .2bit format
        #[arg(short = 'g', long = "two-bit")]
        two_bit: PathBuf,

        /// Sequence name
        #[arg(short, long)]
        chrom: String,

        /// Variant start (0-based)
        #[arg(short, long)]
        start: u32,

        /// Variant end (exclusive)
        #[arg(short, long)]
        end: u32,

        /// Inserted bases (empty for a deletion)
        #[arg(short, long, default_value = "")]
        alt: String,

        /// Shift direction
        #[arg(short, long, value_enum, default_value_t = Direction::Left)]
        direction: Direction,

        /// Maximum number of bases to shift (0 for no limit)
        #[arg(long, default_value_t = INDEL_SHIFT_NO_MAX)]
        max_shift: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Left,
    Right,
}

impl From<Direction> for ShiftDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Left => ShiftDirection::Left,
            Direction::Right => ShiftDirection::Right,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::BaseMask {
            input1,
            input2,
            output,
            and,
            quiet,
        } => run_base_mask(input1, input2, output, and, quiet),

        Commands::Coverage { input } => run_coverage(input),

        Commands::IntersectSize { a, b } => run_intersect_size(a, b),

        Commands::Shift {
            two_bit,
            chrom,
            start,
            end,
            alt,
            direction,
            max_shift,
        } => run_shift(two_bit, chrom, start, end, alt, direction, max_shift),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn is_bed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("bed"))
}

/// Load a BED file or a range file, keeping range-file header lines.
fn load_input(path: &Path) -> Result<RangeFile> {
    if is_bed(path) {
        let intervals = bed::read_intervals(path)?;
        info!("Read {} intervals from {}", intervals.len(), path.display());
        Ok(RangeFile::new(build_genome_tree(intervals)?))
    } else {
        RangeFile::load(path)
    }
}

fn print_summary(tree: &GenomeRangeTree) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(
        handle,
        "{} bases in {} ranges on {} sequences",
        tree.total_covered_length(),
        tree.num_ranges(),
        tree.num_chromosomes()
    )?;
    Ok(())
}

fn run_base_mask(
    input1: PathBuf,
    input2: Option<PathBuf>,
    output: PathBuf,
    and: bool,
    quiet: bool,
) -> Result<()> {
    let merged = match input2 {
        None if and => {
            return Err(Error::Unimplemented("--and needs two inputs"));
        }
        None => {
            let file = load_input(&input1)?;
            file.save(&output)?;
            file
        }
        Some(input2) if and => file_and(&input1, &input2, &output)?,
        Some(input2) if !is_bed(&input1) && !is_bed(&input2) => {
            file_or(&input1, &input2, &output)?
        }
        Some(input2) => {
            let mut file = load_input(&input1)?;
            let second = load_input(&input2)?;
            for line in second.header {
                if !file.header.contains(&line) {
                    file.header.push(line);
                }
            }
            file.tree
                .union_with(second.tree, genorange::range_tree::merge::keep_first)?;
            file.save(&output)?;
            file
        }
    };

    if !quiet {
        print_summary(&merged.tree)?;
    }
    Ok(())
}

fn run_coverage(input: PathBuf) -> Result<()> {
    let tree = load_input(&input)?.tree;
    let per_chrom = map_chromosomes(&tree, |_, t| t.total_covered_length());

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut total = 0u64;
    for (chrom, covered) in per_chrom {
        writeln!(handle, "{}\t{}", chrom, covered)?;
        total += covered;
    }
    writeln!(handle, "total\t{}", total)?;
    Ok(())
}

fn run_intersect_size(a: PathBuf, b: PathBuf) -> Result<()> {
    let a = load_input(&a)?.tree;
    let b = load_input(&b)?.tree;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", a.intersection_size(&b))?;
    Ok(())
}

fn run_shift(
    two_bit: PathBuf,
    chrom: String,
    mut start: u32,
    mut end: u32,
    alt: String,
    direction: Direction,
    max_shift: u32,
) -> Result<()> {
    let mut window = TwoBitFile::open(&two_bit)?.into_window();
    window.fetch(&chrom, start, end)?;

    let mut alt = alt.into_bytes();
    let shifted = indel_shift(
        &mut window,
        &mut start,
        &mut end,
        &mut alt,
        max_shift,
        direction.into(),
    )?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(
        handle,
        "{}\t{}\t{}\t{}\t{}",
        chrom,
        start,
        end,
        String::from_utf8_lossy(&alt),
        shifted
    )?;
    Ok(())
}
