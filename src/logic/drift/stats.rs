//! Two-sample divergence statistics

/// Bins used by the population stability index
pub const PSI_BINS: usize = 10;

/// Floor for empty PSI bins so the log term stays finite
const PSI_EPSILON: f64 = 1e-4;

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Kolmogorov-Smirnov D: the largest gap between the two empirical CDFs.
///
/// Both inputs must be non-empty.
pub fn ks_statistic(reference: &[f64], production: &[f64]) -> f64 {
    let a = sorted(reference);
    let b = sorted(production);
    let (n, m) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        // Step over ties on both sides before comparing
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// Asymptotic p-value of a KS statistic for sample sizes `n` and `m`
pub fn ks_p_value(d: f64, n: usize, m: usize) -> f64 {
    if n == 0 || m == 0 {
        return 1.0;
    }
    let en = ((n * m) as f64 / (n + m) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    if lambda < 1e-3 {
        return 1.0;
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let k = k as f64;
        let term = sign * (-2.0 * k * k * lambda * lambda).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Population stability index over reference-quantile bins.
///
/// Both inputs must be non-empty.
pub fn population_stability_index(reference: &[f64], production: &[f64]) -> f64 {
    let a = sorted(reference);

    let mut edges: Vec<f64> = (1..PSI_BINS)
        .map(|k| a[(k * a.len() / PSI_BINS).min(a.len() - 1)])
        .collect();
    edges.dedup();

    let expected = bin_fractions(&edges, reference);
    let actual = bin_fractions(&edges, production);

    expected
        .iter()
        .zip(&actual)
        .map(|(&p, &q)| {
            let p = p.max(PSI_EPSILON);
            let q = q.max(PSI_EPSILON);
            (q - p) * (q / p).ln()
        })
        .sum()
}

fn bin_fractions(edges: &[f64], values: &[f64]) -> Vec<f64> {
    let mut counts = vec![0usize; edges.len() + 1];
    for &v in values {
        counts[edges.partition_point(|&e| e <= v)] += 1;
    }
    let total = values.len() as f64;
    counts.into_iter().map(|c| c as f64 / total).collect()
}
