use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Output;

use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use squigmap::align::{align_events, normalize_query_window, Alignment};
use squigmap::events::{detect_events, EventParams};
use squigmap::model::PoreModel;
use squigmap::pipeline::AlignOpts;
use squigmap::refsynth::SyntheticRef;
use squigmap::slow5::RawRecord;

pub const DIGITISATION: f32 = 8192.0;
pub const OFFSET: f32 = 10.0;
pub const RANGE: f32 = 1467.61;
pub const SAMPLING_RATE: f32 = 4000.0;

pub fn run_squigmap(args: &[&str]) -> anyhow::Result<Output> {
    let exe = Path::new(env!("CARGO_BIN_EXE_squigmap"));
    assert!(exe.exists());

    let output = std::process::Command::new(exe)
        .args(args)
        .stderr(std::process::Stdio::null())
        .output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(anyhow!("failed to run {:?}", args.join(" ")))
    }
}

pub fn seeded_seq(seed: u64, len: usize, alphabet: &[u8]) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect()
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            other => other,
        })
        .collect()
}

/// Synthesize a raw trace by dwelling on each k-mer of `seq` in turn, at the
/// model's expected level plus uniform noise, then inverting the picoamp
/// calibration. `reversed` walks the k-mers 3'->5' the way direct RNA does.
pub fn signal_for_sequence(
    seq: &[u8],
    model: &PoreModel,
    samples_per_kmer: usize,
    noise_pa: f32,
    seed: u64,
    reversed: bool,
) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut kmers =
        seq.windows(model.kmer_size()).collect::<Vec<&[u8]>>();
    if reversed {
        kmers.reverse();
    }
    let raw_unit = RANGE / DIGITISATION;
    kmers
        .iter()
        .flat_map(|kmer| {
            let level = model.level_mean(kmer);
            (0..samples_per_kmer)
                .map(|_| {
                    let pa =
                        level + rng.gen_range(-noise_pa..=noise_pa);
                    let raw = pa / raw_unit - OFFSET;
                    raw.round() as i16
                })
                .collect::<Vec<i16>>()
        })
        .collect()
}

pub fn write_fasta(
    path: &Path,
    contigs: &[(&str, &[u8])],
) -> anyhow::Result<()> {
    let mut fh = File::create(path)?;
    for (name, seq) in contigs {
        writeln!(fh, ">{name}")?;
        fh.write_all(seq)?;
        writeln!(fh)?;
    }
    Ok(())
}

pub fn write_signal_file(
    path: &Path,
    reads: &[(&str, &[i16])],
) -> anyhow::Result<()> {
    let mut fh = File::create(path)?;
    writeln!(fh, "#signal_version\t2.0")?;
    writeln!(fh, "@device\tsynthetic")?;
    writeln!(
        fh,
        "#read_id\tread_group\tdigitisation\toffset\trange\tsampling_rate\t\
         len_raw_signal\traw_signal"
    )?;
    for (read_id, raw) in reads {
        let samples = if raw.is_empty() {
            "*".to_owned()
        } else {
            raw.iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>()
                .join(",")
        };
        writeln!(
            fh,
            "{read_id}\t0\t{DIGITISATION}\t{OFFSET}\t{RANGE}\t\
             {SAMPLING_RATE}\t{}\t{samples}",
            raw.len()
        )?;
    }
    Ok(())
}

/// Run the per-read chain (calibrate, segment, normalize, align) the way the
/// pipeline does, but hand back the alignment so scores can be inspected.
pub fn align_signal(
    raw: &[i16],
    refs: &SyntheticRef,
    opts: &AlignOpts,
) -> Option<Alignment> {
    let record = RawRecord {
        read_id: "test-read".to_owned(),
        raw_signal: raw.to_vec(),
        digitisation: DIGITISATION,
        offset: OFFSET,
        range: RANGE,
    };
    let signal = record.to_picoamps();
    let mut events =
        detect_events(&signal, &EventParams::for_mode(opts.rna));
    if opts.rna {
        events.reverse();
    }
    if events.is_empty() {
        return None;
    }
    let window = normalize_query_window(
        &mut events,
        &record.read_id,
        opts.prefix_size,
        opts.query_size,
    )
    .expect("window should normalize");
    align_events(&events, window, refs)
}

pub fn paf_fields(row: &str) -> Vec<String> {
    row.trim_end().split('\t').map(|f| f.to_owned()).collect()
}
