//! Small statistical toolkit backing the analyzers and summarizers.
//!
//! Quantiles use linear interpolation and standard deviation is the sample
//! deviation. Persisted documents depend on both conventions staying put.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::BinningPolicy;
use crate::errors::DataError;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let center = mean(values);
    let sum_squares: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    (sum_squares / (values.len() - 1) as f64).sqrt()
}

/// Linear-interpolated quantile over unsorted input. `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Distribution summary in the shape the persisted JSON documents use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: u64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub q50: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Describe {
    if values.is_empty() {
        return Describe::default();
    }
    Describe {
        count: values.len() as u64,
        mean: round2(mean(values)),
        std: round2(std_dev(values)),
        min: round2(quantile(values, 0.0)),
        q25: round2(quantile(values, 0.25)),
        q50: round2(quantile(values, 0.5)),
        q75: round2(quantile(values, 0.75)),
        max: round2(quantile(values, 1.0)),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ranks values 1..=n with ties broken by input order, so every rank is
/// distinct. Used to force full quantile buckets for heavily tied counts.
pub fn rank_first(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
    let mut ranks = vec![0.0; values.len()];
    for (rank, &index) in order.iter().enumerate() {
        ranks[index] = (rank + 1) as f64;
    }
    ranks
}

/// Quantile-based bucket assignment (1 = lowest bucket).
///
/// Duplicate quantile edges collapse into fewer buckets. Under
/// [`BinningPolicy::Lenient`] the collapsed bucket count is returned
/// alongside the assignments; under [`BinningPolicy::Strict`] a collapse is
/// a [`DataError::BinningCollapse`].
pub fn quantile_bins(
    values: &[f64],
    bins: usize,
    policy: BinningPolicy,
    metric: &'static str,
) -> Result<(Vec<u8>, usize), DataError> {
    if values.is_empty() {
        return Ok((Vec::new(), 0));
    }

    let mut edges: Vec<f64> = (0..=bins).map(|i| quantile(values, i as f64 / bins as f64)).collect();
    edges.dedup();
    let actual = edges.len().saturating_sub(1).max(1);

    if actual < bins && policy == BinningPolicy::Strict {
        return Err(DataError::BinningCollapse { metric, requested: bins, actual });
    }

    let assignments = values
        .iter()
        .map(|&value| {
            let mut bucket = actual;
            for (index, edge) in edges.iter().enumerate().skip(1) {
                if value <= *edge {
                    bucket = index;
                    break;
                }
            }
            bucket.min(actual) as u8
        })
        .collect();

    Ok((assignments, actual))
}

pub fn log1p(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.ln_1p()).collect()
}

/// Zero-mean unit-variance scaling; constant columns scale to all zeros.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let center = mean(values);
    let spread = std_dev(values);
    if spread <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - center) / spread).collect()
}

/// Lloyd's k-means over row-major points with a fixed seed.
///
/// `k` is clamped to the number of points. Label assignment is fully
/// deterministic for a given seed: initial centroids are a seeded sample and
/// distance ties resolve to the lowest cluster index.
pub fn kmeans(points: &[Vec<f64>], k: usize, seed: u64, max_iterations: usize) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }
    let k = k.clamp(1, points.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let initial = rand::seq::index::sample(&mut rng, points.len(), k);
    let mut centroids: Vec<Vec<f64>> = initial.iter().map(|index| points[index].clone()).collect();

    let mut assignments = vec![0usize; points.len()];
    for _ in 0..max_iterations {
        let mut changed = false;
        for (index, point) in points.iter().enumerate() {
            let nearest = nearest_centroid(point, &centroids);
            if assignments[index] != nearest {
                assignments[index] = nearest;
                changed = true;
            }
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = points
                .iter()
                .zip(&assignments)
                .filter(|(_, &assigned)| assigned == cluster)
                .map(|(point, _)| point)
                .collect();
            // An emptied cluster keeps its previous centroid.
            if members.is_empty() {
                continue;
            }
            for dimension in 0..centroid.len() {
                centroid[dimension] =
                    members.iter().map(|point| point[dimension]).sum::<f64>() / members.len() as f64;
            }
        }

        if !changed {
            break;
        }
    }
    assignments
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance: f64 =
            point.iter().zip(centroid).map(|(a, b)| (a - b).powi(2)).sum();
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}
