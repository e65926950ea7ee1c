//! Adaptive event segmentation of a picoamp trace, the dual-window t-test
//! scheme used by the open-source basecaller event detectors: two rolling
//! windows produce t-statistic tracks, a short/long peak detector picks
//! boundaries, and the samples between successive boundaries become events.

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Event {
    /// sample index of the first sample in the event
    pub start: u64,
    pub length: f32,
    pub mean: f32,
    pub stdv: f32,
}

#[derive(Debug, Copy, Clone)]
pub struct EventParams {
    pub window_length1: usize,
    pub window_length2: usize,
    pub threshold1: f32,
    pub threshold2: f32,
    pub peak_height: f32,
}

impl EventParams {
    pub fn dna() -> Self {
        Self {
            window_length1: 3,
            window_length2: 6,
            threshold1: 1.4,
            threshold2: 9.0,
            peak_height: 0.2,
        }
    }

    pub fn rna() -> Self {
        Self {
            window_length1: 7,
            window_length2: 14,
            threshold1: 2.5,
            threshold2: 9.0,
            peak_height: 1.0,
        }
    }

    pub fn for_mode(rna: bool) -> Self {
        if rna {
            Self::rna()
        } else {
            Self::dna()
        }
    }
}

/// Segment a current trace into events. Traces shorter than the two window
/// lengths combined produce an empty table.
pub fn detect_events(signal: &[f32], params: &EventParams) -> Vec<Event> {
    if signal.len() < params.window_length1 + params.window_length2 {
        return Vec::new();
    }
    let (sums, sumsqs) = prefix_sums(signal);
    let tstat1 = compute_tstat(&sums, &sumsqs, params.window_length1);
    let tstat2 = compute_tstat(&sums, &sumsqs, params.window_length2);
    let peaks = detect_peaks(&tstat1, &tstat2, params);
    events_from_boundaries(&peaks, &sums, &sumsqs)
}

fn prefix_sums(signal: &[f32]) -> (Vec<f64>, Vec<f64>) {
    let mut sums = Vec::with_capacity(signal.len());
    let mut sumsqs = Vec::with_capacity(signal.len());
    let mut sum = 0f64;
    let mut sumsq = 0f64;
    for &x in signal {
        let x = x as f64;
        sum += x;
        sumsq += x * x;
        sums.push(sum);
        sumsqs.push(sumsq);
    }
    (sums, sumsqs)
}

// Windowed Welch t-statistic between the w samples before and after each
// position, from the running sums.
fn compute_tstat(sums: &[f64], sumsqs: &[f64], w: usize) -> Vec<f32> {
    let n = sums.len();
    let mut tstat = vec![0f32; n];
    if n < 2 * w {
        return tstat;
    }
    let eta = f32::MIN_POSITIVE as f64;
    let wf = w as f64;
    for i in w..=(n - w) {
        let mut sum1 = sums[i - 1];
        let mut sumsq1 = sumsqs[i - 1];
        if i > w {
            sum1 -= sums[i - w - 1];
            sumsq1 -= sumsqs[i - w - 1];
        }
        let sum2 = sums[i + w - 1] - sums[i - 1];
        let sumsq2 = sumsqs[i + w - 1] - sumsqs[i - 1];
        let mean1 = sum1 / wf;
        let mean2 = sum2 / wf;
        let combined_var =
            (sumsq1 / wf - mean1 * mean1 + sumsq2 / wf - mean2 * mean2)
                .max(eta);
        let delta_mean = mean2 - mean1;
        tstat[i] = (delta_mean.abs() / (combined_var / wf).sqrt()) as f32;
    }
    tstat
}

struct Detector<'a> {
    signal: &'a [f32],
    window_length: usize,
    threshold: f32,
    masked_to: usize,
    peak_pos: Option<usize>,
    peak_value: f32,
    valid_peak: bool,
}

struct DetectorStep {
    fired: Option<usize>,
    armed: Option<usize>,
}

impl<'a> Detector<'a> {
    fn new(signal: &'a [f32], window_length: usize, threshold: f32) -> Self {
        Self {
            signal,
            window_length,
            threshold,
            masked_to: 0,
            peak_pos: None,
            peak_value: f32::MAX,
            valid_peak: false,
        }
    }

    fn mask_to(&mut self, masked_to: usize) {
        self.masked_to = masked_to;
        self.peak_pos = None;
        self.peak_value = f32::MAX;
        self.valid_peak = false;
    }

    fn step(&mut self, i: usize, peak_height: f32) -> DetectorStep {
        let mut outcome = DetectorStep { fired: None, armed: None };
        if self.masked_to >= i {
            return outcome;
        }
        let current_value = self.signal[i];
        match self.peak_pos {
            None => {
                // no candidate yet, follow the descent then wait for a rise
                // of at least peak_height
                if current_value < self.peak_value {
                    self.peak_value = current_value;
                } else if current_value - self.peak_value > peak_height {
                    self.peak_value = current_value;
                    self.peak_pos = Some(i);
                }
            }
            Some(mut peak_pos) => {
                if current_value > self.peak_value {
                    self.peak_value = current_value;
                    peak_pos = i;
                    self.peak_pos = Some(i);
                }
                if self.peak_value > self.threshold {
                    outcome.armed = Some(peak_pos);
                }
                if self.peak_value - current_value > peak_height
                    && self.peak_value > self.threshold
                {
                    self.valid_peak = true;
                }
                if self.valid_peak && (i - peak_pos) > self.window_length / 2 {
                    outcome.fired = Some(peak_pos);
                    self.peak_pos = None;
                    self.peak_value = current_value;
                    self.valid_peak = false;
                }
            }
        }
        outcome
    }
}

fn detect_peaks(
    tstat1: &[f32],
    tstat2: &[f32],
    params: &EventParams,
) -> Vec<usize> {
    let mut short = Detector::new(
        tstat1,
        params.window_length1,
        params.threshold1,
    );
    let mut long =
        Detector::new(tstat2, params.window_length2, params.threshold2);
    let mut peaks = Vec::new();
    for i in 0..tstat1.len() {
        let outcome = short.step(i, params.peak_height);
        // while the short detector holds a peak above threshold it owns the
        // neighbourhood, so the long track is masked past it
        if let Some(pos) = outcome.armed {
            long.mask_to(pos + short.window_length);
        }
        if let Some(pos) = outcome.fired {
            peaks.push(pos);
        }
        if let Some(pos) = long.step(i, params.peak_height).fired {
            peaks.push(pos);
        }
    }
    peaks
}

fn events_from_boundaries(
    peaks: &[usize],
    sums: &[f64],
    sumsqs: &[f64],
) -> Vec<Event> {
    let nsample = sums.len();
    let mut events = Vec::with_capacity(peaks.len() + 1);
    let mut last_end = 0usize;
    for &peak in peaks {
        // boundaries must strictly advance; the two tracks can fire out of
        // order around a masked region
        if peak <= last_end || peak >= nsample {
            continue;
        }
        events.push(create_event(last_end, peak, sums, sumsqs));
        last_end = peak;
    }
    events.push(create_event(last_end, nsample, sums, sumsqs));
    events
}

fn create_event(
    start: usize,
    end: usize,
    sums: &[f64],
    sumsqs: &[f64],
) -> Event {
    let length = (end - start) as f64;
    let prev_sum = if start > 0 { sums[start - 1] } else { 0.0 };
    let prev_sumsq = if start > 0 { sumsqs[start - 1] } else { 0.0 };
    let mean = (sums[end - 1] - prev_sum) / length;
    let var = ((sumsqs[end - 1] - prev_sumsq) / length - mean * mean).max(0.0);
    Event {
        start: start as u64,
        length: length as f32,
        mean: mean as f32,
        stdv: var.sqrt() as f32,
    }
}
