//! Subsequence dynamic time warping with an L1 local cost. The first row of
//! the cost matrix is seeded with the local cost alone, so the query may
//! start anywhere on the reference; the best alignment ends at the minimum
//! of the last row.

/// Fill `cost` (row-major, `query.len() x reference.len()`) and return the
/// best score together with the reference column it ends on. Ties resolve to
/// the earliest column. Returns None when either side is empty.
pub fn subsequence_dtw(
    query: &[f32],
    reference: &[f32],
    cost: &mut Vec<f32>,
) -> Option<(f32, usize)> {
    let m = query.len();
    let n = reference.len();
    if m == 0 || n == 0 {
        return None;
    }
    cost.clear();
    cost.resize(m * n, 0f32);
    for j in 0..n {
        cost[j] = (query[0] - reference[j]).abs();
    }
    for i in 1..m {
        let row = i * n;
        let prev = row - n;
        cost[row] = cost[prev] + (query[i] - reference[0]).abs();
        for j in 1..n {
            let local = (query[i] - reference[j]).abs();
            let best =
                cost[prev + j].min(cost[row + j - 1]).min(cost[prev + j - 1]);
            cost[row + j] = local + best;
        }
    }
    let last_row = &cost[(m - 1) * n..];
    let mut best_score = f32::INFINITY;
    let mut best_end = 0usize;
    for (j, &score) in last_row.iter().enumerate() {
        if score < best_score {
            best_score = score;
            best_end = j;
        }
    }
    Some((best_score, best_end))
}
