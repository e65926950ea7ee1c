use std::ops::Range;

use derive_new::new;
use itertools::Itertools;
use log::debug;
use log_once::warn_once;

use crate::dtw::subsequence_dtw;
use crate::errs::{SqError, SqResult};
use crate::events::Event;
use crate::refsynth::SyntheticRef;
use crate::util::Strand;

/// Best placement of one read on the reference. `pos` is the k-mer index the
/// alignment ends on, already mapped to forward-strand coordinates for
/// negative-strand hits.
#[derive(Debug, Copy, Clone, PartialEq, new)]
pub struct Alignment {
    pub score: f32,
    pub pos: i64,
    pub rid: i32,
    pub strand: Strand,
}

/// Z-score the `[prefix_size, prefix_size + query_size)` slice of event
/// means in place and return the window actually used. The window is clamped
/// to the table length; a zero-variance window is an error rather than a
/// silent NaN.
pub fn normalize_query_window(
    events: &mut [Event],
    read_id: &str,
    prefix_size: usize,
    query_size: usize,
) -> SqResult<Range<usize>> {
    let n = events.len();
    let mut start = prefix_size;
    let mut end = prefix_size + query_size;
    if start > n {
        start = n;
        warn_once!(
            "reads with fewer events than the query prefix, clamping \
             (subsequent occurrences logged at debug)"
        );
        debug!("read {read_id} has {n} events, prefix is {prefix_size}");
    }
    if end > n {
        end = n;
        warn_once!(
            "reads with fewer events than prefix + query, clamping \
             (subsequent occurrences logged at debug)"
        );
        debug!(
            "read {read_id} has {n} events, prefix + query is {}",
            prefix_size + query_size
        );
    }
    if start == end {
        return Ok(start..end);
    }
    let len = (end - start) as f64;
    let mean = events[start..end].iter().map(|e| e.mean as f64).sum::<f64>()
        / len;
    let var = events[start..end]
        .iter()
        .map(|e| {
            let d = e.mean as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / len;
    let stdv = var.sqrt();
    if stdv == 0.0 {
        return Err(SqError::DegenerateWindow(read_id.to_owned()));
    }
    for event in events[start..end].iter_mut() {
        event.mean = ((event.mean as f64 - mean) / stdv) as f32;
    }
    Ok(start..end)
}

/// Run subsequence DTW of the normalized window against every contig and
/// strand, keeping the strictly best score so earlier contigs, the forward
/// strand, and earlier end columns win ties. None when the window is empty.
pub fn align_events(
    events: &[Event],
    window: Range<usize>,
    refs: &SyntheticRef,
) -> Option<Alignment> {
    if window.is_empty() {
        return None;
    }
    let query = events[window].iter().map(|e| e.mean).collect_vec();
    let mut cost = Vec::new();
    let mut best: Option<Alignment> = None;
    for (rid, contig) in refs.contigs.iter().enumerate() {
        if let Some((score, end)) =
            subsequence_dtw(&query, &contig.forward, &mut cost)
        {
            if best.as_ref().map(|b| score < b.score).unwrap_or(true) {
                best = Some(Alignment::new(
                    score,
                    end as i64,
                    rid as i32,
                    Strand::Positive,
                ));
            }
        }
        if let Some((score, end)) =
            subsequence_dtw(&query, &contig.reverse, &mut cost)
        {
            if best.as_ref().map(|b| score < b.score).unwrap_or(true) {
                best = Some(Alignment::new(
                    score,
                    contig.length as i64 - end as i64,
                    rid as i32,
                    Strand::Negative,
                ));
            }
        }
    }
    best
}
