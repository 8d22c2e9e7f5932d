use crate::data::model::Series;

/// Dynamic time warping distance between two series with the same channel
/// count.
///
/// The local cost of aligning `a[i]` with `b[j]` is the Euclidean distance
/// between the two rows; the result is the sum of local costs along the
/// cheapest warping path. `radius` restricts the path to a Sakoe-Chiba band
/// `|i - j| <= radius` (widened to the length difference so a path always
/// exists).
pub fn dtw_distance(a: &Series, b: &Series, radius: Option<usize>) -> f64 {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return if n == m { 0.0 } else { f64::INFINITY };
    }
    let band = radius.map(|r| r.max(n.abs_diff(m)));

    // Two rolling rows of the accumulated cost matrix, offset by one so
    // column 0 is the "before the start" border.
    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr.fill(f64::INFINITY);
        let (lo, hi) = match band {
            Some(r) => (i.saturating_sub(r).max(1), (i + r).min(m)),
            None => (1, m),
        };
        for j in lo..=hi {
            let cost = row_distance(a.row(i - 1), b.row(j - 1));
            let best = prev[j - 1].min(prev[j]).min(curr[j - 1]);
            curr[j] = cost + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

fn row_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}
