//! Clustering models: K-Means and DBSCAN via linfa, plus the optimal-K sweep

use crate::evaluation;
use linfa::prelude::*;
use linfa_clustering::{Dbscan, KMeans};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

/// Label value marking DBSCAN noise points
pub const NOISE: i64 = -1;

/// K-Means model wrapper with fitted parameters
pub struct KMeansModel {
    /// Fitted K-Means model from linfa
    pub model: KMeans<f64, L2Dist>,
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignments for training data
    pub labels: Array1<i64>,
    /// Cluster centroids in standardized space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
}

impl KMeansModel {
    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if (label as usize) < self.n_clusters {
                sizes[label as usize] += 1;
            }
        }
        sizes
    }
}

/// Fit K-Means on the standardized modeling matrix.
///
/// Uses k-means++ initialization with 10 restarts and a seeded RNG so runs
/// are reproducible.
pub fn fit_kmeans(
    data: &Array2<f64>,
    n_clusters: usize,
    max_iters: usize,
    tolerance: f64,
    seed: u64,
) -> crate::Result<KMeansModel> {
    if n_clusters < 2 {
        anyhow::bail!("K-Means needs at least 2 clusters, got {}", n_clusters);
    }
    if data.nrows() < n_clusters {
        anyhow::bail!(
            "Number of data points ({}) must be at least equal to number of clusters ({})",
            data.nrows(),
            n_clusters
        );
    }

    let n_samples = data.nrows();
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(data.clone(), targets);

    let rng = StdRng::seed_from_u64(seed);
    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .max_n_iterations(max_iters as u64)
        .n_runs(10)
        .tolerance(tolerance)
        .fit(&dataset)?;

    let assignments = model.predict(&dataset);
    let labels = assignments.mapv(|label| label as i64);
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(data, &labels, &centroids);

    Ok(KMeansModel {
        model,
        n_clusters,
        labels,
        centroids,
        inertia,
    })
}

/// Inertia and mean silhouette for each K in the swept range
#[derive(Debug, Clone)]
pub struct KSweep {
    pub ks: Vec<usize>,
    pub inertias: Vec<f64>,
    pub silhouettes: Vec<f64>,
}

/// Sweep K from 2 to `max_k`, recording inertia for the elbow method and the
/// sampled mean silhouette for each fit. Ks larger than the sample count are
/// skipped.
pub fn find_optimal_k(
    data: &Array2<f64>,
    max_k: usize,
    max_iters: usize,
    tolerance: f64,
    seed: u64,
    sample_size: usize,
) -> crate::Result<KSweep> {
    if max_k < 2 {
        anyhow::bail!("max_k must be at least 2, got {}", max_k);
    }

    let mut sweep = KSweep {
        ks: Vec::new(),
        inertias: Vec::new(),
        silhouettes: Vec::new(),
    };

    for k in 2..=max_k.min(data.nrows()) {
        let model = fit_kmeans(data, k, max_iters, tolerance, seed)?;
        let silhouette = evaluation::silhouette_score(data, &model.labels, sample_size);
        sweep.ks.push(k);
        sweep.inertias.push(model.inertia);
        sweep.silhouettes.push(silhouette);
    }

    if sweep.ks.is_empty() {
        anyhow::bail!(
            "Too few data points ({}) to sweep any K in 2..={}",
            data.nrows(),
            max_k
        );
    }

    Ok(sweep)
}

/// DBSCAN result: labels with noise marked as -1, plus cluster and noise counts
#[derive(Debug, Clone)]
pub struct DbscanOutcome {
    pub labels: Array1<i64>,
    pub n_clusters: usize,
    pub n_noise: usize,
}

/// Fit DBSCAN on the standardized modeling matrix. `eps` is the neighborhood
/// radius and `min_samples` the core-point threshold; points in no dense
/// region come back labeled -1.
pub fn fit_dbscan(data: &Array2<f64>, eps: f64, min_samples: usize) -> crate::Result<DbscanOutcome> {
    if eps <= 0.0 {
        anyhow::bail!("eps must be positive, got {}", eps);
    }
    if min_samples == 0 {
        anyhow::bail!("min_samples must be at least 1");
    }
    if data.nrows() == 0 {
        anyhow::bail!("Cannot run DBSCAN on an empty matrix");
    }

    let assignments = Dbscan::params(min_samples).tolerance(eps).transform(data)?;
    let labels = assignments.mapv(|assignment| match assignment {
        Some(cluster) => cluster as i64,
        None => NOISE,
    });

    let (n_clusters, n_noise) = count_clusters(&labels);
    Ok(DbscanOutcome {
        labels,
        n_clusters,
        n_noise,
    })
}

/// Count distinct non-noise clusters and noise points in a label vector
pub fn count_clusters(labels: &Array1<i64>) -> (usize, usize) {
    let clusters: BTreeSet<i64> = labels.iter().copied().filter(|&label| label != NOISE).collect();
    let n_noise = labels.iter().filter(|&&label| label == NOISE).count();
    (clusters.len(), n_noise)
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(data: &Array2<f64>, labels: &Array1<i64>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster >= 0 && (cluster as usize) < centroids.nrows() {
            let point = data.row(i);
            let centroid = centroids.row(cluster as usize);
            let distance_sq = point
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>();
            inertia += distance_sq;
        }
    }

    inertia
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Two tight blobs far apart, eight points total
    fn two_blob_data() -> Array2<f64> {
        Array2::from_shape_vec(
            (8, 2),
            vec![
                0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 0.1, -0.1, //
                8.0, 8.0, 8.1, 8.1, 7.9, 8.0, 8.0, 8.2,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_kmeans_separates_blobs() {
        let data = two_blob_data();
        let model = fit_kmeans(&data, 2, 100, 1e-4, 42).unwrap();

        assert_eq!(model.n_clusters, 2);
        assert_eq!(model.labels.len(), 8);
        assert_eq!(model.centroids.shape(), &[2, 2]);

        // All points of one blob share a label, and the blobs differ
        assert!(model.labels.slice(ndarray::s![0..4]).iter().all(|&l| l == model.labels[0]));
        assert!(model.labels.slice(ndarray::s![4..8]).iter().all(|&l| l == model.labels[4]));
        assert_ne!(model.labels[0], model.labels[4]);

        let sizes = model.cluster_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 8);
    }

    #[test]
    fn test_fit_kmeans_inertia_is_finite() {
        let data = two_blob_data();
        let model = fit_kmeans(&data, 2, 100, 1e-4, 42).unwrap();
        assert!(model.inertia.is_finite());
        assert!(model.inertia >= 0.0);
    }

    #[test]
    fn test_fit_kmeans_invalid_parameters() {
        let data = two_blob_data();
        assert!(fit_kmeans(&data, 1, 100, 1e-4, 42).is_err());
        assert!(fit_kmeans(&data, 9, 100, 1e-4, 42).is_err());
    }

    #[test]
    fn test_find_optimal_k_sweep() {
        let data = two_blob_data();
        let sweep = find_optimal_k(&data, 4, 100, 1e-4, 42, 100).unwrap();

        assert_eq!(sweep.ks, vec![2, 3, 4]);
        assert_eq!(sweep.inertias.len(), 3);
        assert_eq!(sweep.silhouettes.len(), 3);

        // More clusters never increase the within-cluster sum of squares
        assert!(sweep.inertias[0] >= sweep.inertias[2] - 1e-9);
        // Two well-separated blobs peak at K=2
        assert!(sweep.silhouettes[0] >= sweep.silhouettes[1]);
    }

    #[test]
    fn test_fit_dbscan_finds_blobs_and_noise() {
        let mut raw = two_blob_data().into_raw_vec();
        raw.extend_from_slice(&[100.0, 100.0]); // isolated point
        let data = Array2::from_shape_vec((9, 2), raw).unwrap();

        let outcome = fit_dbscan(&data, 1.0, 3).unwrap();
        assert_eq!(outcome.labels.len(), 9);
        assert_eq!(outcome.n_clusters, 2);
        assert_eq!(outcome.n_noise, 1);
        assert_eq!(outcome.labels[8], NOISE);
    }

    #[test]
    fn test_fit_dbscan_all_noise() {
        let data = Array2::from_shape_vec(
            (4, 2),
            vec![0.0, 0.0, 10.0, 10.0, 20.0, 20.0, 30.0, 30.0],
        )
        .unwrap();

        let outcome = fit_dbscan(&data, 0.5, 2).unwrap();
        assert_eq!(outcome.n_clusters, 0);
        assert_eq!(outcome.n_noise, 4);
    }

    #[test]
    fn test_fit_dbscan_invalid_parameters() {
        let data = two_blob_data();
        assert!(fit_dbscan(&data, 0.0, 2).is_err());
        assert!(fit_dbscan(&data, 1.0, 0).is_err());
    }

    #[test]
    fn test_count_clusters_ignores_noise() {
        let labels = Array1::from(vec![0i64, 0, 1, NOISE, 2, NOISE]);
        let (n_clusters, n_noise) = count_clusters(&labels);
        assert_eq!(n_clusters, 3);
        assert_eq!(n_noise, 2);
    }
}
