/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

/// Shannon entropy (natural log) of a histogram of weighted counts.
///
/// Empty buckets contribute nothing. An all-zero histogram has entropy 0,
/// callers never ask for one.
pub fn entropy(hist: &[f64]) -> f64 {
    let total: f64 = hist.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut h = 0.0;
    for c in hist {
        let p = c / total;
        let log_term = if *c == 0.0 { 1.0 } else { p };
        h -= p * log_term.ln();
    }
    // -0.0 for a pure histogram
    h.max(0.0)
}

/// Index of the largest value, the first one on ties.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if *v <= b => {}
            _ => best = Some((i, *v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Number of buckets with a nonzero count.
pub fn n_nonzero(hist: &[f64]) -> usize {
    hist.iter().filter(|c| **c > 0.0).count()
}

/// Check that a value is a finite integer.
#[inline]
pub fn is_integer_code(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0
}

pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}
