use std::path::Path;

use bio::alphabets::dna::revcomp;
use bio::io::fasta::Reader as FastaReader;
use log::{info, warn};

use crate::errs::{SqError, SqResult};
use crate::model::PoreModel;

/// One reference contig rendered as expected current. `length` is the number
/// of k-mers, so `length = sequence length - k + 1`, and the forward and
/// reverse arrays always agree on it.
#[derive(Debug, Clone)]
pub struct RefContig {
    pub name: String,
    pub length: usize,
    pub forward: Vec<f32>,
    pub reverse: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct SyntheticRef {
    pub contigs: Vec<RefContig>,
    kmer_size: usize,
}

impl SyntheticRef {
    pub fn from_fasta<P: AsRef<Path>>(
        fasta: P,
        model: &PoreModel,
        rna: bool,
        query_size: usize,
    ) -> anyhow::Result<Self> {
        let path = fasta.as_ref();
        let reader = FastaReader::from_file(path)?;
        let records = reader.records().filter_map(|record| match record {
            Ok(record) => {
                Some((record.id().to_owned(), record.seq().to_vec()))
            }
            Err(e) => {
                warn!("failed to read FASTA record, {e}");
                None
            }
        });
        let synth = Self::from_records(records, model, rna, query_size)?;
        info!(
            "synthesized {} contig(s) from {path:?} with a {}-mer model",
            synth.contigs.len(),
            synth.kmer_size
        );
        Ok(synth)
    }

    /// Build from any `(name, sequence)` source. Sequences are uppercased,
    /// `U` is treated as `T`, and contigs too short to carry a full query
    /// window are skipped.
    pub fn from_records(
        records: impl IntoIterator<Item = (String, Vec<u8>)>,
        model: &PoreModel,
        rna: bool,
        query_size: usize,
    ) -> SqResult<Self> {
        let k = model.kmer_size();
        let mut contigs = Vec::new();
        for (name, mut seq) in records {
            seq.make_ascii_uppercase();
            if rna {
                for base in seq.iter_mut() {
                    if *base == b'U' {
                        *base = b'T';
                    }
                }
            }
            if seq.len() < query_size + k - 1 {
                warn!(
                    "skipping contig {name}, {} bases cannot hold a \
                     {query_size} k-mer query window",
                    seq.len()
                );
                continue;
            }
            let mut forward = expected_signal(&seq, model);
            let mut reverse = expected_signal(&revcomp(&seq), model);
            znorm(&mut forward);
            znorm(&mut reverse);
            debug_assert_eq!(forward.len(), reverse.len());
            contigs.push(RefContig {
                name,
                length: forward.len(),
                forward,
                reverse,
            });
        }
        if contigs.is_empty() {
            return Err(SqError::MalformedReference(
                "no usable contigs".to_owned(),
            ));
        }
        Ok(Self { contigs, kmer_size: k })
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn num_contigs(&self) -> usize {
        self.contigs.len()
    }
}

fn expected_signal(seq: &[u8], model: &PoreModel) -> Vec<f32> {
    seq.windows(model.kmer_size())
        .map(|kmer| model.level_mean(kmer))
        .collect()
}

// Z-normalize in place so the synthesized strands live on the same scale as
// the normalized query events. A flat contig is left mean-centred.
fn znorm(xs: &mut [f32]) {
    let n = xs.len() as f64;
    let mean = xs.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = xs
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let stdv = var.sqrt();
    for x in xs.iter_mut() {
        let centred = *x as f64 - mean;
        *x = if stdv > 0.0 { (centred / stdv) as f32 } else { centred as f32 };
    }
}
