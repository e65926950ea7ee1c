use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::Context;
use crossbeam_channel::bounded;
use derive_new::new;
use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::align::{align_events, normalize_query_window, Alignment};
use crate::errs::{SqError, SqResult};
use crate::events::{detect_events, EventParams};
use crate::model::{BuiltinModel, PoreModel};
use crate::refsynth::SyntheticRef;
use crate::slow5::{parse_blob, Slow5Reader};
use crate::util::get_ticker;
use crate::writers::PafWriter;

#[derive(Debug, Clone)]
pub struct AlignOpts {
    /// max records loaded per batch
    pub batch_size: usize,
    /// max bytes loaded per batch
    pub batch_size_bytes: usize,
    pub num_thread: usize,
    /// events skipped at the start of each read
    pub prefix_size: usize,
    /// events aligned after the prefix
    pub query_size: usize,
    pub rna: bool,
    pub model_file: Option<PathBuf>,
}

impl Default for AlignOpts {
    fn default() -> Self {
        Self {
            batch_size: 512,
            batch_size_bytes: 2_000_000,
            num_thread: 8,
            prefix_size: 50,
            query_size: 250,
            rna: false,
            model_file: None,
        }
    }
}

/// Per-read outcome, in input order. `aln` is None for reads that had
/// nothing to align (no signal, or the whole table inside the prefix).
#[derive(Debug, Clone, new)]
pub struct ReadAlignment {
    pub read_id: String,
    pub aln: Option<Alignment>,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct RunSummary {
    pub total_reads: usize,
    pub total_bytes: usize,
    pub load_secs: f64,
    pub process_secs: f64,
    pub output_secs: f64,
}

struct LoadedBatch {
    blobs: Vec<Vec<u8>>,
    sum_bytes: usize,
    load_secs: f64,
}

pub fn load_model(opts: &AlignOpts) -> anyhow::Result<PoreModel> {
    match &opts.model_file {
        Some(fp) => PoreModel::from_file(fp)
            .with_context(|| format!("failed to load pore model {fp:?}")),
        None => {
            let model_id = if opts.rna {
                BuiltinModel::RnaNucleotide
            } else {
                BuiltinModel::DnaNucleotide
            };
            info!("using built-in {model_id:?} model");
            Ok(PoreModel::builtin(model_id))
        }
    }
}

fn process_blob(
    blob: &[u8],
    opts: &AlignOpts,
    refs: &SyntheticRef,
    params: &EventParams,
) -> SqResult<ReadAlignment> {
    let record = parse_blob(blob)?;
    let signal = record.to_picoamps();
    let mut events = detect_events(&signal, params);
    // RNA traverses the pore 3'->5', flip the table to match the reference
    // orientation
    if opts.rna {
        events.reverse();
    }
    if events.is_empty() {
        debug!("read {} produced no events", record.read_id);
        return Ok(ReadAlignment::new(record.read_id, None));
    }
    let window = normalize_query_window(
        &mut events,
        &record.read_id,
        opts.prefix_size,
        opts.query_size,
    )?;
    let aln = align_events(&events, window, refs);
    Ok(ReadAlignment::new(record.read_id, aln))
}

/// Align every read in `signal_file` against `reference_fasta`, writing one
/// row per read in input order. Batches overlap: a loader thread stays one
/// batch ahead while the worker pool processes the current one.
pub fn run<W: Write>(
    opts: AlignOpts,
    reference_fasta: &Path,
    signal_file: &Path,
    writer: &mut PafWriter<W>,
) -> anyhow::Result<RunSummary> {
    let model = load_model(&opts)?;
    let refs =
        SyntheticRef::from_fasta(reference_fasta, &model, opts.rna, opts.query_size)
            .with_context(|| {
                format!("failed to synthesize reference from {reference_fasta:?}")
            })?;
    let params = EventParams::for_mode(opts.rna);
    let pool = ThreadPoolBuilder::new()
        .num_threads(opts.num_thread)
        .build()
        .context("failed to build worker pool")?;
    let mut reader = Slow5Reader::from_path(signal_file)
        .with_context(|| format!("failed to open signal file {signal_file:?}"))?;

    let (snd, rcv) = bounded::<SqResult<LoadedBatch>>(2);
    let batch_size = opts.batch_size;
    let batch_size_bytes = opts.batch_size_bytes;
    let loader = thread::spawn(move || {
        let mut at_eof = false;
        while !at_eof {
            let load_start = Instant::now();
            let mut blobs = Vec::with_capacity(batch_size);
            let mut sum_bytes = 0usize;
            let mut failure: Option<SqError> = None;
            while blobs.len() < batch_size && sum_bytes < batch_size_bytes {
                match reader.next_blob() {
                    Some(Ok(blob)) => {
                        sum_bytes += blob.len();
                        blobs.push(blob);
                    }
                    Some(Err(e)) => {
                        failure = Some(e.into());
                        at_eof = true;
                        break;
                    }
                    None => {
                        at_eof = true;
                        break;
                    }
                }
            }
            if let Some(e) = failure {
                let _ = snd.send(Err(e));
                break;
            }
            if blobs.is_empty() {
                break;
            }
            let batch = LoadedBatch {
                blobs,
                sum_bytes,
                load_secs: load_start.elapsed().as_secs_f64(),
            };
            if snd.send(Ok(batch)).is_err() {
                // consumer went away, nothing left to do
                break;
            }
        }
    });

    let ticker = get_ticker();
    ticker.set_message("reads aligned");
    let mut summary = RunSummary::default();
    for batch in rcv {
        let batch = batch.context("failed reading from signal file")?;
        summary.load_secs += batch.load_secs;

        let process_start = Instant::now();
        let results = pool.install(|| {
            batch
                .blobs
                .par_iter()
                .map(|blob| process_blob(blob, &opts, &refs, &params))
                .collect::<Vec<SqResult<ReadAlignment>>>()
        });
        summary.process_secs += process_start.elapsed().as_secs_f64();

        let output_start = Instant::now();
        for result in results {
            let read_aln = result?;
            writer.write_row(&read_aln, &refs, &opts)?;
            ticker.inc(1);
        }
        summary.output_secs += output_start.elapsed().as_secs_f64();
        summary.total_reads += batch.blobs.len();
        summary.total_bytes += batch.sum_bytes;
    }
    loader.join().map_err(|_| anyhow::anyhow!("loader thread panicked"))?;
    writer.flush()?;
    ticker.finish_and_clear();
    info!(
        "aligned {} reads ({} bytes): load {:.3}s, process {:.3}s, output \
         {:.3}s",
        summary.total_reads,
        summary.total_bytes,
        summary.load_secs,
        summary.process_secs,
        summary.output_secs
    );
    Ok(summary)
}
