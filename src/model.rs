use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use lazy_static::lazy_static;
use log::info;

use crate::errs::{SqError, SqResult};

pub const DNA_KMER_SIZE: usize = 6;
pub const RNA_KMER_SIZE: usize = 9;

/// Expected current for one k-mer, in picoamps.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct KmerLevel {
    pub mean: f32,
    pub stdv: f32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BuiltinModel {
    DnaNucleotide,
    RnaNucleotide,
}

/// Dense k-mer level table, indexed by the base-4 encoding of the k-mer
/// (A=0, C=1, G=2, T/U=3). The table always holds `4^k` entries.
#[derive(Debug, Clone)]
pub struct PoreModel {
    kmer_size: usize,
    levels: Vec<KmerLevel>,
}

#[inline]
pub(crate) fn encode_base(base: u8) -> usize {
    // ambiguous bases (N, IUPAC codes) deliberately collapse to A
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' | b'U' | b'u' => 3,
        _ => 0,
    }
}

#[inline]
pub(crate) fn encode_kmer(kmer: &[u8]) -> usize {
    kmer.iter().fold(0usize, |acc, &b| (acc << 2) | encode_base(b))
}

// Mean pore current and spread contributed by each base, A/C/G/T.
const BASE_PA: [f32; 4] = [106.4, 84.7, 77.2, 94.1];
const BASE_SPREAD: [f32; 4] = [1.7, 2.4, 2.1, 1.9];

// The bases sitting in the pore constriction dominate the observed level, so
// positions are weighted by an asymmetric peak just downstream of centre.
fn position_weights(kmer_size: usize) -> Vec<f32> {
    let peak = kmer_size as f32 * 0.55;
    let raw = (0..kmer_size)
        .map(|p| 1.0f32 / (1.0 + (p as f32 - peak).abs()))
        .collect::<Vec<f32>>();
    let total = raw.iter().sum::<f32>();
    raw.into_iter().map(|w| w / total).collect()
}

fn builtin_levels(kmer_size: usize) -> Vec<KmerLevel> {
    let weights = position_weights(kmer_size);
    (0..4usize.pow(kmer_size as u32))
        .map(|idx| {
            let mut mean = 0f32;
            let mut stdv = 0f32;
            for (pos, weight) in weights.iter().enumerate() {
                let shift = 2 * (kmer_size - pos - 1);
                let base = (idx >> shift) & 0x3;
                mean += weight * BASE_PA[base];
                stdv += weight * BASE_SPREAD[base];
            }
            KmerLevel { mean, stdv }
        })
        .collect()
}

lazy_static! {
    static ref DNA_LEVELS: Vec<KmerLevel> = builtin_levels(DNA_KMER_SIZE);
    static ref RNA_LEVELS: Vec<KmerLevel> = builtin_levels(RNA_KMER_SIZE);
}

impl PoreModel {
    pub fn builtin(model_id: BuiltinModel) -> Self {
        match model_id {
            BuiltinModel::DnaNucleotide => {
                Self { kmer_size: DNA_KMER_SIZE, levels: DNA_LEVELS.clone() }
            }
            BuiltinModel::RnaNucleotide => {
                Self { kmer_size: RNA_KMER_SIZE, levels: RNA_LEVELS.clone() }
            }
        }
    }

    /// Load a model from a whitespace-separated text table of
    /// `kmer mean stdv [extras..]` rows. Comment lines (`#`) and a `kmer`
    /// header line are tolerated, k is inferred from the first row, and the
    /// table must end up with exactly `4^k` rows.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SqResult<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut kmer_size = 0usize;
        let mut levels: Vec<KmerLevel> = Vec::new();
        let mut n_rows = 0usize;
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("kmer")
            {
                continue;
            }
            let mut fields = line.split_whitespace();
            let kmer = fields.next().ok_or_else(|| {
                SqError::MalformedModel(format!(
                    "missing k-mer on line {}",
                    line_num + 1
                ))
            })?;
            let mean = parse_level_field(fields.next(), "mean", line_num)?;
            let stdv = parse_level_field(fields.next(), "stdv", line_num)?;
            if kmer_size == 0 {
                kmer_size = kmer.len();
                levels =
                    vec![KmerLevel::default(); 4usize.pow(kmer_size as u32)];
            } else if kmer.len() != kmer_size {
                return Err(SqError::MalformedModel(format!(
                    "inconsistent k-mer size on line {}, expected {} got {}",
                    line_num + 1,
                    kmer_size,
                    kmer.len()
                )));
            }
            levels[encode_kmer(kmer.as_bytes())] = KmerLevel { mean, stdv };
            n_rows += 1;
        }
        if kmer_size == 0 {
            return Err(SqError::MalformedModel(format!(
                "no k-mer rows in {path:?}"
            )));
        }
        if n_rows != levels.len() {
            return Err(SqError::MalformedModel(format!(
                "expected {} rows for a {}-mer model, got {}",
                levels.len(),
                kmer_size,
                n_rows
            )));
        }
        info!("loaded {kmer_size}-mer pore model from {path:?}");
        Ok(Self { kmer_size, levels })
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    #[inline]
    pub fn level_mean(&self, kmer: &[u8]) -> f32 {
        self.levels[encode_kmer(kmer)].mean
    }

    #[inline]
    pub fn level_stdv(&self, kmer: &[u8]) -> f32 {
        self.levels[encode_kmer(kmer)].stdv
    }
}

fn parse_level_field(
    field: Option<&str>,
    label: &str,
    line_num: usize,
) -> SqResult<f32> {
    field
        .and_then(|raw| raw.parse::<f32>().ok())
        .ok_or_else(|| {
            SqError::MalformedModel(format!(
                "missing or unparsable {label} on line {}",
                line_num + 1
            ))
        })
}
