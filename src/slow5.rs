//! Reader for the ASCII signal-record layout: header lines open with `#` or
//! `@`, and each record line carries
//! `read_id  read_group  digitisation  offset  range  sampling_rate
//! len_raw_signal  raw_signal` with the raw samples comma-separated.
//!
//! Loading and parsing are split so the batch loader can pull cheap raw
//! lines ("blobs") off disk while the worker pool does the parsing.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::errs::{SqError, SqResult};
use crate::util::MISSING_SYMBOL;

/// One decoded signal read plus its calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub read_id: String,
    pub raw_signal: Vec<i16>,
    pub digitisation: f32,
    pub offset: f32,
    pub range: f32,
}

impl RawRecord {
    /// Calibrate the integer samples to picoamps.
    pub fn to_picoamps(&self) -> Vec<f32> {
        let raw_unit = self.range / self.digitisation;
        self.raw_signal
            .iter()
            .map(|&raw| (raw as f32 + self.offset) * raw_unit)
            .collect()
    }
}

pub struct Slow5Reader<R: BufRead> {
    reader: R,
}

impl Slow5Reader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> SqResult<Self> {
        let fh = File::open(path)?;
        Ok(Self::new(BufReader::new(fh)))
    }
}

impl<R: BufRead> Slow5Reader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Next record line as raw bytes, skipping headers and blank lines.
    /// None at end of file.
    pub fn next_blob(&mut self) -> Option<io::Result<Vec<u8>>> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    if line.starts_with('#')
                        || line.starts_with('@')
                        || line.trim().is_empty()
                    {
                        continue;
                    }
                    return Some(Ok(line.into_bytes()));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn malformed(msg: String) -> SqError {
    SqError::MalformedRecord(msg)
}

/// Decode one record line pulled by `next_blob`.
pub fn parse_blob(blob: &[u8]) -> SqResult<RawRecord> {
    let line = std::str::from_utf8(blob)
        .map_err(|_| malformed("record line is not utf-8".to_owned()))?;
    let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
    let read_id = fields
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed("missing read_id".to_owned()))?
        .to_owned();
    let _read_group = fields
        .next()
        .ok_or_else(|| malformed(format!("{read_id}: missing read_group")))?;
    let digitisation = parse_f32(fields.next(), &read_id, "digitisation")?;
    let offset = parse_f32(fields.next(), &read_id, "offset")?;
    let range = parse_f32(fields.next(), &read_id, "range")?;
    let _sampling_rate = parse_f32(fields.next(), &read_id, "sampling_rate")?;
    let len_raw_signal = fields
        .next()
        .and_then(|raw| raw.parse::<usize>().ok())
        .ok_or_else(|| {
            malformed(format!("{read_id}: missing or bad len_raw_signal"))
        })?;
    let raw_field = fields.next().unwrap_or("");
    let raw_signal = if raw_field.is_empty() || raw_field == MISSING_SYMBOL {
        Vec::new()
    } else {
        raw_field
            .split(',')
            .map(|sample| {
                sample.parse::<i16>().map_err(|_| {
                    malformed(format!(
                        "{read_id}: bad raw sample {sample:?}"
                    ))
                })
            })
            .collect::<SqResult<Vec<i16>>>()?
    };
    if raw_signal.len() != len_raw_signal {
        return Err(malformed(format!(
            "{read_id}: len_raw_signal is {len_raw_signal} but {} samples \
             present",
            raw_signal.len()
        )));
    }
    if digitisation == 0.0 {
        return Err(malformed(format!("{read_id}: digitisation is zero")));
    }
    Ok(RawRecord { read_id, raw_signal, digitisation, offset, range })
}

fn parse_f32(
    field: Option<&str>,
    read_id: &str,
    label: &str,
) -> SqResult<f32> {
    field.and_then(|raw| raw.parse::<f32>().ok()).ok_or_else(|| {
        malformed(format!("{read_id}: missing or bad {label}"))
    })
}

#[cfg(test)]
mod slow5_tests {
    use assert_approx_eq::assert_approx_eq;

    use crate::errs::SqError;

    use super::{parse_blob, Slow5Reader};

    const HEADER: &str = "#slow5_version\t2.0\n\
                          @asic_id\t420\n\
                          #read_id\tread_group\tdigitisation\toffset\trange\t\
                          sampling_rate\tlen_raw_signal\traw_signal\n";

    #[test]
    fn test_slow5_reader_skips_headers() {
        let body = format!(
            "{HEADER}r1\t0\t8192\t10\t1467.61\t4000\t3\t430,431,432\n\
             r2\t0\t8192\t10\t1467.61\t4000\t0\t*\n"
        );
        let mut reader = Slow5Reader::new(body.as_bytes());
        let blob1 = reader.next_blob().unwrap().unwrap();
        let record1 = parse_blob(&blob1).unwrap();
        assert_eq!(record1.read_id, "r1");
        assert_eq!(record1.raw_signal, vec![430, 431, 432]);
        let blob2 = reader.next_blob().unwrap().unwrap();
        let record2 = parse_blob(&blob2).unwrap();
        assert_eq!(record2.read_id, "r2");
        assert!(record2.raw_signal.is_empty());
        assert!(reader.next_blob().is_none());
    }

    #[test]
    fn test_slow5_picoamp_conversion() {
        let record = parse_blob(
            b"r1\t0\t8192\t10\t1467.61\t4000\t2\t100,200",
        )
        .unwrap();
        let pa = record.to_picoamps();
        let raw_unit = 1467.61f32 / 8192.0;
        assert_approx_eq!(pa[0], (100.0 + 10.0) * raw_unit, 1e-4);
        assert_approx_eq!(pa[1], (200.0 + 10.0) * raw_unit, 1e-4);
    }

    #[test]
    fn test_slow5_malformed_records() {
        let cases: [&[u8]; 4] = [
            b"r1\t0\tnot_a_number\t10\t1467.61\t4000\t1\t100",
            b"r1\t0\t8192\t10\t1467.61\t4000\t5\t100,200",
            b"r1\t0\t8192\t10\t1467.61\t4000\t1\tabc",
            b"r1\t0\t8192",
        ];
        for case in cases {
            assert!(
                matches!(parse_blob(case), Err(SqError::MalformedRecord(_))),
                "expected malformed record for {:?}",
                String::from_utf8_lossy(case)
            );
        }
    }
}
