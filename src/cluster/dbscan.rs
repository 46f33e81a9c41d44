//! Density-based clustering over a text-distance matrix
//!
//! Distance between two keywords combines textual dissimilarity with a
//! damped search-volume gap, so "cheap flights" and "flight deals" sit
//! close while a head term and a long-tail term drift apart.

use crate::text::similarity;
use crate::types::Keyword;

pub const DBSCAN_EPSILON: f64 = 0.3;
pub const DBSCAN_MIN_POINTS: usize = 2;

/// Pairwise distance matrix:
/// d(i,j) = (1 - sim(text_i, text_j)) + 0.2 * |ln(v_i+1) - ln(v_j+1)| / 10
pub fn distance_matrix(keywords: &[Keyword]) -> Vec<Vec<f64>> {
    let n = keywords.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let text_distance = 1.0 - similarity(&keywords[i].text, &keywords[j].text);
            let volume_gap = ((keywords[i].search_volume as f64 + 1.0).ln()
                - (keywords[j].search_volume as f64 + 1.0).ln())
            .abs();
            let d = text_distance + 0.2 * volume_gap / 10.0;
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }
    matrix
}

/// Run DBSCAN over a precomputed distance matrix. Returns one label per
/// point; `None` marks noise.
pub fn dbscan(matrix: &[Vec<f64>], epsilon: f64, min_points: usize) -> Vec<Option<usize>> {
    let n = matrix.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut cluster = 0usize;

    for point in 0..n {
        if visited[point] {
            continue;
        }
        visited[point] = true;

        let neighbors = region_query(matrix, point, epsilon);
        if neighbors.len() < min_points {
            continue; // noise, may be absorbed by a later cluster
        }

        labels[point] = Some(cluster);
        let mut queue: Vec<usize> = neighbors;
        let mut head = 0;
        while head < queue.len() {
            let candidate = queue[head];
            head += 1;

            if !visited[candidate] {
                visited[candidate] = true;
                let candidate_neighbors = region_query(matrix, candidate, epsilon);
                if candidate_neighbors.len() >= min_points {
                    for neighbor in candidate_neighbors {
                        if !queue.contains(&neighbor) {
                            queue.push(neighbor);
                        }
                    }
                }
            }
            if labels[candidate].is_none() {
                labels[candidate] = Some(cluster);
            }
        }

        cluster += 1;
    }

    labels
}

/// Indices within epsilon of the point (the point itself included).
fn region_query(matrix: &[Vec<f64>], point: usize, epsilon: f64) -> Vec<usize> {
    (0..matrix.len())
        .filter(|&other| matrix[point][other] <= epsilon)
        .collect()
}
