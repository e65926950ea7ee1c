use std::io::{BufWriter, Stdout, Write};

use crate::pipeline::{AlignOpts, ReadAlignment};
use crate::refsynth::SyntheticRef;
use crate::util::{MISSING_SYMBOL, TAB};

pub trait OutWriter<T> {
    fn write(&mut self, item: T) -> anyhow::Result<u64>;
}

pub struct TsvWriter<W: Write> {
    buf_writer: BufWriter<W>,
}

impl TsvWriter<Stdout> {
    pub fn new_stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { buf_writer: BufWriter::new(writer) }
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.buf_writer.flush()?;
        Ok(())
    }

    pub fn into_inner(mut self) -> anyhow::Result<W> {
        self.buf_writer.flush()?;
        self.buf_writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush writer, {}", e.error()))
    }
}

impl<W: Write> OutWriter<&str> for TsvWriter<W> {
    fn write(&mut self, item: &str) -> anyhow::Result<u64> {
        self.buf_writer.write_all(item.as_bytes())?;
        Ok(1)
    }
}

/// Serializes one PAF-like row per read. Reads with nothing to align (no
/// signal, or an empty query window) get a sentinel row so every input read
/// appears exactly once on the output.
pub struct PafWriter<W: Write> {
    inner: TsvWriter<W>,
    rows_written: u64,
}

impl PafWriter<Stdout> {
    pub fn new_stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> PafWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: TsvWriter::new(writer), rows_written: 0 }
    }

    pub fn write_row(
        &mut self,
        read: &ReadAlignment,
        refs: &SyntheticRef,
        opts: &AlignOpts,
    ) -> anyhow::Result<u64> {
        let tab = TAB;
        let query_end = opts.prefix_size + opts.query_size;
        let row = match &read.aln {
            Some(aln) => {
                let contig = &refs.contigs[aln.rid as usize];
                let target_len = contig.length + refs.kmer_size() - 1;
                format!(
                    "{}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}\n",
                    read.read_id,
                    opts.query_size,
                    opts.prefix_size,
                    query_end,
                    aln.strand,
                    contig.name,
                    target_len,
                    aln.pos - opts.query_size as i64,
                    aln.pos,
                    target_len,
                    target_len,
                    60,
                )
            }
            None => {
                let missing = MISSING_SYMBOL;
                format!(
                    "{}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {}{tab}\
                     {missing}{tab}\
                     {missing}{tab}\
                     {missing}{tab}\
                     {missing}{tab}\
                     {missing}{tab}\
                     {missing}{tab}\
                     {missing}{tab}\
                     {}\n",
                    read.read_id, opts.query_size, opts.prefix_size,
                    query_end, 0,
                )
            }
        };
        let n = self.inner.write(&row)?;
        self.rows_written += n;
        Ok(n)
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.inner.flush()
    }

    pub fn num_rows(&self) -> u64 {
        self.rows_written
    }

    pub fn into_inner(self) -> anyhow::Result<W> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod writers_tests {
    use crate::align::Alignment;
    use crate::model::{BuiltinModel, PoreModel};
    use crate::pipeline::{AlignOpts, ReadAlignment};
    use crate::refsynth::SyntheticRef;
    use crate::util::Strand;

    use super::PafWriter;

    fn test_refs() -> SyntheticRef {
        let model = PoreModel::builtin(BuiltinModel::DnaNucleotide);
        let seq = (0..300)
            .map(|i| b"ACGTTGCA"[i % 8])
            .collect::<Vec<u8>>();
        SyntheticRef::from_records(
            [("chr1".to_owned(), seq)],
            &model,
            false,
            50,
        )
        .unwrap()
    }

    #[test]
    fn test_writers_aligned_row_fields() {
        let refs = test_refs();
        let opts = AlignOpts::default();
        let read = ReadAlignment {
            read_id: "read-1".to_owned(),
            aln: Some(Alignment {
                score: 12.5,
                pos: 280,
                rid: 0,
                strand: Strand::Positive,
            }),
        };
        let mut writer = PafWriter::new(Vec::new());
        writer.write_row(&read, &refs, &opts).unwrap();
        writer.flush().unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let fields = out.trim_end().split('\t').collect::<Vec<&str>>();
        let target_len = (295 + 6 - 1).to_string();
        assert_eq!(
            fields,
            vec![
                "read-1",
                "250",
                "50",
                "300",
                "+",
                "chr1",
                target_len.as_str(),
                "30",
                "280",
                target_len.as_str(),
                target_len.as_str(),
                "60"
            ]
        );
    }

    #[test]
    fn test_writers_sentinel_row() {
        let refs = test_refs();
        let opts = AlignOpts::default();
        let read = ReadAlignment { read_id: "empty".to_owned(), aln: None };
        let mut writer = PafWriter::new(Vec::new());
        writer.write_row(&read, &refs, &opts).unwrap();
        assert_eq!(writer.num_rows(), 1);
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "empty\t250\t50\t300\t*\t*\t*\t*\t*\t*\t*\t0\n");
    }
}
