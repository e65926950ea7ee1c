use std::path::PathBuf;

use clap::Parser;
use log::info;

use squigmap::logging::init_logging;
use squigmap::pipeline::{run, AlignOpts};
use squigmap::writers::PafWriter;

/// Align raw nanopore signal to a reference by locating each read's
/// event-space query window on a model-synthesized expected signal. Emits
/// one PAF-like row per read on stdout.
#[derive(Parser)]
#[command(name = "squigmap", version, about)]
struct Args {
    /// Reference FASTA.
    reference: PathBuf,
    /// Signal file (ASCII records of read_id, calibration, and raw samples).
    signal: PathBuf,
    /// Maximum number of records loaded per batch.
    #[arg(short = 'K', long = "batchsize", default_value_t = 512)]
    batch_size: usize,
    /// Maximum number of bytes loaded per batch.
    #[arg(short = 'B', long = "max-bytes", default_value_t = 2_000_000)]
    batch_size_bytes: usize,
    /// Number of worker threads.
    #[arg(short = 't', long, default_value_t = 8)]
    threads: usize,
    /// Number of events skipped at the start of each read.
    #[arg(short = 'p', long, default_value_t = 50)]
    prefix_size: usize,
    /// Number of events aligned after the prefix.
    #[arg(short = 'q', long, default_value_t = 250)]
    query_size: usize,
    /// The reads are direct RNA, use the RNA model and event orientation.
    #[arg(long, default_value_t = false)]
    rna: bool,
    /// Pore model file overriding the built-in model.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Path to file to write run log.
    #[arg(long, alias = "log")]
    log_filepath: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _handle = init_logging(args.log_filepath.as_ref());
    let opts = AlignOpts {
        batch_size: args.batch_size,
        batch_size_bytes: args.batch_size_bytes,
        num_thread: args.threads,
        prefix_size: args.prefix_size,
        query_size: args.query_size,
        rna: args.rna,
        model_file: args.model,
    };
    let mut writer = PafWriter::new_stdout();
    let summary = run(opts, &args.reference, &args.signal, &mut writer)?;
    info!("done, {} reads", summary.total_reads);
    Ok(())
}
