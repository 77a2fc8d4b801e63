//! Agglomerative hierarchical clustering with Lance-Williams linkage updates

use ndarray::{Array1, Array2};

/// Pairwise-matrix memory guard; beyond this the caller should subsample
const MAX_SAMPLES: usize = 10_000;

/// Cluster-distance update rule applied when two clusters merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Single,
    Complete,
    Average,
    /// Minimum-variance criterion
    Ward,
}

/// Bottom-up agglomerative clustering.
///
/// Starts from singleton clusters and repeatedly merges the closest pair
/// under the configured linkage until `n_clusters` remain. Distances between
/// merged clusters are maintained with the Lance-Williams recurrence, so no
/// linkage ever rescans the raw points.
#[derive(Debug, Clone)]
pub struct AgglomerativeClustering {
    n_clusters: usize,
    linkage: Linkage,
}

impl AgglomerativeClustering {
    pub fn new(n_clusters: usize) -> Self {
        AgglomerativeClustering {
            n_clusters,
            linkage: Linkage::Ward,
        }
    }

    pub fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Cluster the rows of `data` and return one label per row.
    ///
    /// Labels are assigned in order of first appearance, so the output is
    /// deterministic for a given input.
    pub fn fit_predict(&self, data: &Array2<f64>) -> crate::Result<Array1<i64>> {
        let n_samples = data.nrows();
        if n_samples == 0 || data.ncols() == 0 {
            anyhow::bail!("Cannot cluster an empty matrix");
        }
        if self.n_clusters == 0 {
            anyhow::bail!("Number of clusters must be at least 1");
        }
        if self.n_clusters > n_samples {
            anyhow::bail!(
                "Number of clusters ({}) exceeds number of samples ({})",
                self.n_clusters,
                n_samples
            );
        }
        if n_samples > MAX_SAMPLES {
            anyhow::bail!(
                "Agglomerative clustering is limited to {} samples (got {}); subsample first",
                MAX_SAMPLES,
                n_samples
            );
        }

        // Ward's recurrence operates on squared Euclidean distances; the
        // other linkages use plain distances. Only merge order matters here,
        // no dendrogram heights are reported.
        let mut dist = pairwise_distances(data, self.linkage == Linkage::Ward);
        let mut active = vec![true; n_samples];
        let mut sizes = vec![1usize; n_samples];
        let mut membership: Vec<usize> = (0..n_samples).collect();
        let mut nearest: Vec<Option<(f64, usize)>> = vec![None; n_samples];
        let mut remaining = n_samples;

        while remaining > self.n_clusters {
            // Refresh stale nearest-neighbor entries, then pick the closest
            // active pair.
            let mut best: Option<(f64, usize, usize)> = None;
            for i in 0..n_samples {
                if !active[i] {
                    continue;
                }
                let stale = match nearest[i] {
                    Some((_, target)) => !active[target],
                    None => true,
                };
                if stale {
                    nearest[i] = scan_nearest(&dist, &active, n_samples, i);
                }
                if let Some((d, j)) = nearest[i] {
                    if best.map_or(true, |(bd, _, _)| d < bd) {
                        best = Some((d, i, j));
                    }
                }
            }

            let (_, mut keep, mut drop) = best
                .ok_or_else(|| anyhow::anyhow!("No mergeable cluster pair found"))?;
            if keep > drop {
                std::mem::swap(&mut keep, &mut drop);
            }

            let d_ij = dist[keep * n_samples + drop];
            let ni = sizes[keep] as f64;
            let nj = sizes[drop] as f64;

            for k in 0..n_samples {
                if !active[k] || k == keep || k == drop {
                    continue;
                }
                let d_ik = dist[keep * n_samples + k];
                let d_jk = dist[drop * n_samples + k];
                let merged = merged_distance(self.linkage, d_ik, d_jk, d_ij, ni, nj, sizes[k] as f64);
                dist[keep * n_samples + k] = merged;
                dist[k * n_samples + keep] = merged;

                // The merged cluster may have become k's nearest neighbor;
                // entries pointing at the merged pair are recomputed lazily
                match nearest[k] {
                    Some((d, target)) if target != keep && target != drop => {
                        if merged < d {
                            nearest[k] = Some((merged, keep));
                        }
                    }
                    _ => nearest[k] = None,
                }
            }

            active[drop] = false;
            sizes[keep] += sizes[drop];
            nearest[keep] = None;
            for entry in membership.iter_mut() {
                if *entry == drop {
                    *entry = keep;
                }
            }
            remaining -= 1;
        }

        Ok(relabel(&membership))
    }
}

/// Flat row-major pairwise distance matrix, squared when requested
fn pairwise_distances(data: &Array2<f64>, squared: bool) -> Vec<f64> {
    let n = data.nrows();
    let mut dist = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d_sq: f64 = data
                .row(i)
                .iter()
                .zip(data.row(j).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            let d = if squared { d_sq } else { d_sq.sqrt() };
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }
    dist
}

fn scan_nearest(dist: &[f64], active: &[bool], n: usize, i: usize) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for j in 0..n {
        if j == i || !active[j] {
            continue;
        }
        let d = dist[i * n + j];
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, j));
        }
    }
    best
}

/// Lance-Williams update for the distance between cluster k and the merge of
/// clusters i and j
fn merged_distance(linkage: Linkage, d_ik: f64, d_jk: f64, d_ij: f64, ni: f64, nj: f64, nk: f64) -> f64 {
    match linkage {
        Linkage::Single => d_ik.min(d_jk),
        Linkage::Complete => d_ik.max(d_jk),
        Linkage::Average => (ni * d_ik + nj * d_jk) / (ni + nj),
        Linkage::Ward => ((ni + nk) * d_ik + (nj + nk) * d_jk - nk * d_ij) / (ni + nj + nk),
    }
}

/// Map cluster representatives to consecutive labels by first appearance
fn relabel(membership: &[usize]) -> Array1<i64> {
    let mut next_label = 0i64;
    let mut labels = vec![0i64; membership.len()];
    let mut seen: std::collections::HashMap<usize, i64> = std::collections::HashMap::new();
    for (i, &representative) in membership.iter().enumerate() {
        let label = *seen.entry(representative).or_insert_with(|| {
            let label = next_label;
            next_label += 1;
            label
        });
        labels[i] = label;
    }
    Array1::from(labels)
}
