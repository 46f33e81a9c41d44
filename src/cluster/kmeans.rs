//! K-means clustering with k-means++ initialization
//!
//! Seeded deterministically so the same keyword set always clusters the
//! same way.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

const RNG_SEED: u64 = 42;

/// K-means runner
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    tolerance: f64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 100,
            tolerance: 1e-4,
        }
    }

    /// Choose k for a keyword set: floor(sqrt(n/2)) clamped to
    /// [min_clusters, max_clusters] and never above n.
    pub fn choose_k(n: usize, min_clusters: usize, max_clusters: usize) -> usize {
        let natural = ((n as f64 / 2.0).sqrt().floor()) as usize;
        natural.clamp(min_clusters, max_clusters).min(n.max(1))
    }

    /// Cluster the vectors, returning one assignment per input.
    pub fn fit(&self, vectors: &[Vec<f64>]) -> Vec<usize> {
        if vectors.is_empty() {
            return Vec::new();
        }
        let k = self.k.min(vectors.len()).max(1);
        if k == 1 {
            return vec![0; vectors.len()];
        }

        let mut centroids = kmeans_plus_plus_init(vectors, k);
        let mut assignments = vec![0usize; vectors.len()];
        let mut prev_inertia = f64::MAX;

        for iteration in 0..self.max_iterations {
            // Assign points to nearest centroid
            for (i, vector) in vectors.iter().enumerate() {
                let mut best = 0;
                let mut best_distance = f64::MAX;
                for (j, centroid) in centroids.iter().enumerate() {
                    let distance = cosine_distance(vector, centroid);
                    if distance < best_distance {
                        best_distance = distance;
                        best = j;
                    }
                }
                assignments[i] = best;
            }

            // Update centroids
            let dims = vectors[0].len();
            let mut new_centroids = vec![vec![0.0f64; dims]; k];
            let mut counts = vec![0usize; k];
            for (i, vector) in vectors.iter().enumerate() {
                let cluster = assignments[i];
                counts[cluster] += 1;
                for (j, &val) in vector.iter().enumerate() {
                    new_centroids[cluster][j] += val;
                }
            }
            for (centroid, &count) in new_centroids.iter_mut().zip(counts.iter()) {
                if count > 0 {
                    for val in centroid.iter_mut() {
                        *val /= count as f64;
                    }
                }
            }

            let inertia = compute_inertia(vectors, &new_centroids, &assignments);
            let delta = (prev_inertia - inertia).abs();
            debug!(
                "k-means iteration {}: inertia = {:.6}, delta = {:.6}",
                iteration, inertia, delta
            );

            centroids = new_centroids;
            if delta < self.tolerance {
                debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
            prev_inertia = inertia;
        }

        assignments
    }
}

/// Initialize centroids using the k-means++ scheme: the first at random,
/// the rest with probability proportional to squared distance from the
/// nearest chosen centroid.
fn kmeans_plus_plus_init(vectors: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(RNG_SEED);
    let mut centroids = Vec::with_capacity(k);

    let first_idx = rng.gen_range(0..vectors.len());
    centroids.push(vectors[first_idx].clone());

    while centroids.len() < k {
        let mut distances: Vec<f64> = vectors
            .iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| cosine_distance(v, c))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        for d in distances.iter_mut() {
            *d = d.powi(2);
        }
        let sum: f64 = distances.iter().sum();
        if sum > 0.0 {
            for d in distances.iter_mut() {
                *d /= sum;
            }
        }

        let r: f64 = rng.gen();
        let mut cumsum = 0.0;
        let mut chosen = 0;
        for (i, &prob) in distances.iter().enumerate() {
            cumsum += prob;
            if cumsum >= r {
                chosen = i;
                break;
            }
        }
        centroids.push(vectors[chosen].clone());
    }

    centroids
}

fn compute_inertia(vectors: &[Vec<f64>], centroids: &[Vec<f64>], assignments: &[usize]) -> f64 {
    vectors
        .iter()
        .zip(assignments.iter())
        .map(|(v, &cluster)| cosine_distance(v, &centroids[cluster]).powi(2))
        .sum()
}

fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}
