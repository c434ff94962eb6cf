//! Severity clustering of `percent_outage`.

use outage_core::{ClusterAssignment, Error, Result, SeverityLevel};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::input::Observation;

/// One-dimensional k-means with k-means++ seeding.
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    /// Independent seedings; the lowest-inertia run wins.
    pub restarts: usize,
    pub max_iter: usize,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            restarts: 10,
            max_iter: 300,
        }
    }

    /// Returns `(centroids, labels)` where labels index into centroids.
    pub fn fit(&self, values: &[f64]) -> Result<(Vec<f64>, Vec<usize>)> {
        if self.k == 0 {
            return Err(Error::analytics("k must be positive"));
        }
        if values.len() < self.k {
            return Err(Error::insufficient(self.k, values.len()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Vec<f64>, Vec<usize>)> = None;

        for _ in 0..self.restarts.max(1) {
            let seeds = self.seed_centroids(values, &mut rng);
            let (centroids, labels) = self.lloyd(values, seeds);
            let inertia = inertia(values, &centroids, &labels);
            if best.as_ref().map_or(true, |(b, _, _)| inertia < *b) {
                best = Some((inertia, centroids, labels));
            }
        }

        best.map(|(_, c, l)| (c, l))
            .ok_or_else(|| Error::analytics("k-means produced no run"))
    }

    fn seed_centroids(&self, values: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(values[rng.gen_range(0..values.len())]);

        while centroids.len() < self.k {
            let weights: Vec<f64> = values
                .iter()
                .map(|v| {
                    centroids
                        .iter()
                        .map(|c| (v - c).powi(2))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            // All weights zero means every value is already a centroid.
            let idx = match WeightedIndex::new(&weights) {
                Ok(dist) => dist.sample(rng),
                Err(_) => rng.gen_range(0..values.len()),
            };
            centroids.push(values[idx]);
        }
        centroids
    }

    fn lloyd(&self, values: &[f64], mut centroids: Vec<f64>) -> (Vec<f64>, Vec<usize>) {
        let mut labels = assign(values, &centroids);

        for iter in 0..self.max_iter {
            let mut sums = vec![0.0; self.k];
            let mut counts = vec![0usize; self.k];
            for (v, &l) in values.iter().zip(&labels) {
                sums[l] += v;
                counts[l] += 1;
            }
            for c in 0..self.k {
                // An empty cluster keeps its previous centroid.
                if counts[c] > 0 {
                    centroids[c] = sums[c] / counts[c] as f64;
                }
            }

            let next = assign(values, &centroids);
            if next == labels {
                debug!(iterations = iter + 1, "k-means converged");
                break;
            }
            labels = next;
        }
        (centroids, labels)
    }
}

fn assign(values: &[f64], centroids: &[f64]) -> Vec<usize> {
    values
        .iter()
        .map(|v| {
            let mut best = 0;
            for (c, centroid) in centroids.iter().enumerate().skip(1) {
                if (v - centroid).abs() < (v - centroids[best]).abs() {
                    best = c;
                }
            }
            best
        })
        .collect()
}

fn inertia(values: &[f64], centroids: &[f64], labels: &[usize]) -> f64 {
    values
        .iter()
        .zip(labels)
        .map(|(v, &l)| (v - centroids[l]).powi(2))
        .sum()
}

/// Zero mean, unit population variance. Constant input maps to zeros.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std < 1e-12 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Cluster `series` into severity levels.
///
/// Labels are re-ranked by ascending centroid so label 0 is always the
/// lowest-severity cluster, whatever order k-means found them in.
pub fn cluster_severity(series: &[Observation], k: usize, seed: u64) -> Result<Vec<ClusterAssignment>> {
    if k != SeverityLevel::ALL.len() {
        return Err(Error::analytics(format!(
            "severity clustering needs k = {}, got {}",
            SeverityLevel::ALL.len(),
            k
        )));
    }

    let raw: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let scaled = standardize(&raw);
    let (centroids, labels) = KMeans::new(k, seed).fit(&scaled)?;

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| centroids[a].total_cmp(&centroids[b]).then(a.cmp(&b)));
    let mut rank = vec![0; k];
    for (position, &cluster) in order.iter().enumerate() {
        rank[cluster] = position;
    }

    series
        .iter()
        .zip(labels)
        .map(|(&(period, percent_outage), label)| {
            let cluster_label = rank[label];
            let severity = SeverityLevel::from_rank(cluster_label)
                .ok_or_else(|| Error::analytics(format!("no severity for rank {}", cluster_label)))?;
            Ok(ClusterAssignment {
                period,
                percent_outage,
                cluster_label,
                severity,
            })
        })
        .collect()
}
