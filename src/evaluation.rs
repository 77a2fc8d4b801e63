//! Internal clustering metrics, model comparison and cluster profiling

use crate::model::NOISE;
use ndarray::{Array1, Array2, ArrayView1};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Metrics for one clustering result
#[derive(Debug, Clone, Serialize)]
pub struct ModelScores {
    pub model: String,
    pub silhouette: f64,
    pub davies_bouldin: f64,
    pub n_clusters: usize,
    pub n_noise: usize,
}

/// Comparison outcome: scored models plus the ones skipped by the
/// two-cluster guard
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub scores: Vec<ModelScores>,
    pub skipped: Vec<String>,
}

/// Mean silhouette coefficient over at most `sample_size` non-noise points.
///
/// The coefficient compares each point's cohesion (mean distance to its own
/// cluster) with its separation (mean distance to the nearest other
/// cluster). Computed on a leading sample for tractability on large bases;
/// returns 0.0 when fewer than two points or two clusters are available.
pub fn silhouette_score(data: &Array2<f64>, labels: &Array1<i64>, sample_size: usize) -> f64 {
    let indices: Vec<usize> = (0..data.nrows().min(labels.len()))
        .filter(|&i| labels[i] != NOISE)
        .collect();
    let sample = &indices[..indices.len().min(sample_size)];
    if sample.len() < 2 {
        return 0.0;
    }

    let clusters: BTreeSet<i64> = sample.iter().map(|&i| labels[i]).collect();
    if clusters.len() < 2 {
        return 0.0;
    }

    let mut silhouette_sum = 0.0;
    for &i in sample {
        let point = data.row(i);
        let own_cluster = labels[i];

        let mut same_cluster: (f64, usize) = (0.0, 0);
        let mut other_clusters: BTreeMap<i64, (f64, usize)> = BTreeMap::new();

        for &j in sample {
            if i == j {
                continue;
            }
            let distance = euclidean_distance(&point, &data.row(j));
            if labels[j] == own_cluster {
                same_cluster.0 += distance;
                same_cluster.1 += 1;
            } else {
                let entry = other_clusters.entry(labels[j]).or_insert((0.0, 0));
                entry.0 += distance;
                entry.1 += 1;
            }
        }

        let a_i = if same_cluster.1 == 0 {
            0.0
        } else {
            same_cluster.0 / same_cluster.1 as f64
        };
        let b_i = other_clusters
            .values()
            .map(|(sum, count)| sum / *count as f64)
            .fold(f64::INFINITY, f64::min);

        let s_i = if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
            0.0
        } else {
            (b_i - a_i) / a_i.max(b_i)
        };
        silhouette_sum += s_i;
    }

    silhouette_sum / sample.len() as f64
}

/// Davies-Bouldin index over non-noise points: the mean, across clusters, of
/// the worst ratio of combined intra-cluster scatter to centroid separation.
/// Lower is better. Needs at least two non-noise clusters.
pub fn davies_bouldin_score(data: &Array2<f64>, labels: &Array1<i64>) -> crate::Result<f64> {
    let clusters: BTreeSet<i64> = labels.iter().copied().filter(|&l| l != NOISE).collect();
    if clusters.len() < 2 {
        anyhow::bail!(
            "Davies-Bouldin index needs at least 2 clusters, found {}",
            clusters.len()
        );
    }

    let n_features = data.ncols();
    let mut centroids: Vec<Array1<f64>> = Vec::with_capacity(clusters.len());
    let mut scatters: Vec<f64> = Vec::with_capacity(clusters.len());

    for &cluster in &clusters {
        let members: Vec<usize> = (0..data.nrows()).filter(|&i| labels[i] == cluster).collect();
        let mut centroid = Array1::zeros(n_features);
        for &i in &members {
            centroid += &data.row(i);
        }
        centroid /= members.len() as f64;

        let scatter = members
            .iter()
            .map(|&i| euclidean_distance(&data.row(i), &centroid.view()))
            .sum::<f64>()
            / members.len() as f64;

        centroids.push(centroid);
        scatters.push(scatter);
    }

    let k = centroids.len();
    let mut db_sum = 0.0;
    for i in 0..k {
        let mut worst: f64 = 0.0;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = euclidean_distance(&centroids[i].view(), &centroids[j].view());
            let ratio = if separation > f64::EPSILON {
                (scatters[i] + scatters[j]) / separation
            } else {
                f64::INFINITY
            };
            worst = worst.max(ratio);
        }
        db_sum += worst;
    }

    Ok(db_sum / k as f64)
}

/// Score every model, skipping any whose labels hold fewer than two distinct
/// non-noise clusters (typical for badly tuned DBSCAN). Skipped models are
/// reported by name rather than failing the comparison.
pub fn evaluate_models(
    data: &Array2<f64>,
    models: &[(&str, &Array1<i64>)],
    sample_size: usize,
) -> crate::Result<Evaluation> {
    let mut scores = Vec::new();
    let mut skipped = Vec::new();

    for (name, labels) in models {
        let (n_clusters, n_noise) = crate::model::count_clusters(labels);
        if n_clusters < 2 {
            println!(
                "Evaluation skipped for model '{}': found fewer than 2 clusters.",
                name
            );
            skipped.push(name.to_string());
            continue;
        }

        let silhouette = silhouette_score(data, labels, sample_size);
        let davies_bouldin = davies_bouldin_score(data, labels)?;
        scores.push(ModelScores {
            model: name.to_string(),
            silhouette,
            davies_bouldin,
            n_clusters,
            n_noise,
        });
    }

    Ok(Evaluation { scores, skipped })
}

/// Per-cluster means of the original (unscaled) numeric columns plus a
/// customer count. Noise rows are excluded, as is `customer_id`. Returns an
/// empty frame when every row is noise.
pub fn cluster_profiles(
    df: &DataFrame,
    labels: &Array1<i64>,
    model_name: &str,
) -> crate::Result<DataFrame> {
    if df.height() != labels.len() {
        anyhow::bail!(
            "Frame has {} rows but {} labels were provided",
            df.height(),
            labels.len()
        );
    }

    let numeric: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|s| s.dtype().is_numeric() && s.name() != "customer_id")
        .map(|s| s.name().to_string())
        .collect();
    if numeric.is_empty() {
        anyhow::bail!("No numeric columns available for profiling");
    }

    let mut selected = df.select(numeric)?;
    selected.with_column(Series::new("cluster", labels.to_vec()))?;

    let profiles = selected
        .lazy()
        .filter(col("cluster").neq(lit(NOISE)))
        .group_by([col("cluster")])
        .agg([
            col("*").exclude(["cluster"]).mean(),
            col("cluster").count().cast(DataType::Int64).alias("n_customers"),
        ])
        .sort("cluster", Default::default())
        .collect()?;

    if profiles.height() == 0 {
        println!(
            "Profile analysis for '{}' produced no clusters (all points are noise).",
            model_name
        );
    }

    Ok(profiles)
}

/// Count / mean / std / min / max summary of every numeric column except
/// `customer_id`, backing the report's exploratory table
pub fn describe_numeric(df: &DataFrame) -> crate::Result<DataFrame> {
    let mut features = Vec::new();
    let mut counts = Vec::new();
    let mut means = Vec::new();
    let mut stds = Vec::new();
    let mut mins = Vec::new();
    let mut maxs = Vec::new();

    for series in df.get_columns() {
        if !series.dtype().is_numeric() || series.name() == "customer_id" {
            continue;
        }
        let values = series.cast(&DataType::Float64)?;
        let values = values.f64()?;
        features.push(series.name().to_string());
        counts.push(values.len() as i64 - values.null_count() as i64);
        means.push(values.mean().unwrap_or(0.0));
        stds.push(values.std(0).unwrap_or(0.0));
        mins.push(values.min().unwrap_or(0.0));
        maxs.push(values.max().unwrap_or(0.0));
    }

    if features.is_empty() {
        anyhow::bail!("No numeric columns to summarize");
    }

    Ok(df!(
        "feature" => features,
        "count" => counts,
        "mean" => means,
        "std" => stds,
        "min" => mins,
        "max" => maxs,
    )?)
}

/// Data-driven highlights for one cluster profile
#[derive(Debug, Clone, Serialize)]
pub struct ClusterHighlight {
    pub cluster: i64,
    pub n_customers: i64,
    pub notes: Vec<String>,
}

/// Describe each cluster by the features whose mean deviates most from the
/// population mean, with direction. Replaces hand-written persona text with
/// something recomputed from the data on every run.
pub fn profile_highlights(
    df: &DataFrame,
    profiles: &DataFrame,
    top: usize,
) -> crate::Result<Vec<ClusterHighlight>> {
    let overall = describe_numeric(df)?;
    let overall_features: Vec<String> = overall
        .column("feature")?
        .str()?
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect();
    let overall_means: Vec<f64> = overall.column("mean")?.f64()?.into_no_null_iter().collect();

    let clusters: Vec<i64> = profiles.column("cluster")?.i64()?.into_no_null_iter().collect();
    let counts: Vec<i64> = profiles
        .column("n_customers")?
        .i64()?
        .into_no_null_iter()
        .collect();

    let mut highlights = Vec::with_capacity(clusters.len());
    for (row, (&cluster, &n_customers)) in clusters.iter().zip(counts.iter()).enumerate() {
        let mut deviations: Vec<(f64, String)> = Vec::new();
        for (feature, &population_mean) in overall_features.iter().zip(overall_means.iter()) {
            let Ok(column) = profiles.column(feature) else {
                continue;
            };
            let cluster_mean = column.cast(&DataType::Float64)?.f64()?.get(row).unwrap_or(0.0);
            let baseline = population_mean.abs().max(f64::EPSILON);
            let deviation = (cluster_mean - population_mean) / baseline;
            deviations.push((deviation, feature.clone()));
        }
        deviations.sort_by(|a, b| b.0.abs().total_cmp(&a.0.abs()));

        let notes: Vec<String> = deviations
            .iter()
            .take(top)
            .filter(|(deviation, _)| deviation.abs() >= 0.01)
            .map(|(deviation, feature)| {
                let direction = if *deviation >= 0.0 { "above" } else { "below" };
                format!(
                    "{} is {:.0}% {} the population average",
                    feature,
                    deviation.abs() * 100.0,
                    direction
                )
            })
            .collect();
        let notes = if notes.is_empty() {
            vec!["close to the population average on every feature".to_string()]
        } else {
            notes
        };

        highlights.push(ClusterHighlight {
            cluster,
            n_customers,
            notes,
        });
    }

    Ok(highlights)
}

/// Calculate Euclidean distance between two points
fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blob_data() -> (Array2<f64>, Array1<i64>) {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.0, 0.2],
            [5.0, 5.0],
            [5.1, 5.1],
            [5.0, 5.2],
        ];
        let labels = Array1::from(vec![0i64, 0, 0, 1, 1, 1]);
        (data, labels)
    }

    #[test]
    fn test_silhouette_high_for_separated_blobs() {
        let (data, labels) = blob_data();
        let score = silhouette_score(&data, &labels, 100);
        assert!(score > 0.8, "got {}", score);
    }

    #[test]
    fn test_silhouette_degenerate_cases() {
        let (data, _) = blob_data();
        let one_cluster = Array1::from(vec![0i64; 6]);
        assert_eq!(silhouette_score(&data, &one_cluster, 100), 0.0);

        let all_noise = Array1::from(vec![NOISE; 6]);
        assert_eq!(silhouette_score(&data, &all_noise, 100), 0.0);
    }

    #[test]
    fn test_silhouette_ignores_noise_points() {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [5.0, 5.0],
            [5.1, 5.1],
            [100.0, -50.0],
        ];
        let labels = Array1::from(vec![0i64, 0, 1, 1, NOISE]);
        let score = silhouette_score(&data, &labels, 100);
        assert!(score > 0.8, "noise point should not drag the score, got {}", score);
    }

    #[test]
    fn test_davies_bouldin_prefers_separated_blobs() {
        let (data, labels) = blob_data();
        let tight = davies_bouldin_score(&data, &labels).unwrap();

        // Same points, labels shuffled across blobs: much worse index
        let shuffled = Array1::from(vec![0i64, 1, 0, 1, 0, 1]);
        let loose = davies_bouldin_score(&data, &shuffled).unwrap();
        assert!(tight < loose, "tight {} loose {}", tight, loose);
    }

    #[test]
    fn test_davies_bouldin_needs_two_clusters() {
        let (data, _) = blob_data();
        let labels = Array1::from(vec![0i64; 6]);
        assert!(davies_bouldin_score(&data, &labels).is_err());
    }

    #[test]
    fn test_evaluate_models_skips_degenerate_labelings() {
        let (data, labels) = blob_data();
        let degenerate = Array1::from(vec![NOISE; 6]);

        let evaluation = evaluate_models(
            &data,
            &[("K-Means", &labels), ("DBSCAN", &degenerate)],
            100,
        )
        .unwrap();

        assert_eq!(evaluation.scores.len(), 1);
        assert_eq!(evaluation.scores[0].model, "K-Means");
        assert_eq!(evaluation.scores[0].n_clusters, 2);
        assert_eq!(evaluation.skipped, vec!["DBSCAN".to_string()]);
    }

    #[test]
    fn test_cluster_profiles_means_and_counts() {
        let df = df!(
            "customer_id" => [1i64, 2, 3, 4],
            "age" => [20i64, 30, 60, 70],
            "debt_amount" => [100.0, 200.0, 1000.0, 2000.0],
            "sex" => ["Male", "Female", "Male", "Female"],
        )
        .unwrap();
        let labels = Array1::from(vec![0i64, 0, 1, 1]);

        let profiles = cluster_profiles(&df, &labels, "K-Means").unwrap();
        assert_eq!(profiles.height(), 2);
        assert!(profiles.column("customer_id").is_err());

        let ages: Vec<f64> = profiles.column("age").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(ages, vec![25.0, 65.0]);

        let counts: Vec<i64> = profiles
            .column("n_customers")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(counts, vec![2, 2]);
    }

    #[test]
    fn test_cluster_profiles_excludes_noise() {
        let df = df!(
            "age" => [20i64, 30, 60, 70],
            "debt_amount" => [100.0, 200.0, 1000.0, 2000.0],
        )
        .unwrap();
        let labels = Array1::from(vec![0i64, 0, 0, NOISE]);

        let profiles = cluster_profiles(&df, &labels, "DBSCAN").unwrap();
        assert_eq!(profiles.height(), 1);
        let counts: Vec<i64> = profiles
            .column("n_customers")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(counts, vec![3]);
    }

    #[test]
    fn test_describe_numeric() {
        let df = df!(
            "customer_id" => [1i64, 2, 3],
            "age" => [20i64, 30, 40],
            "sex" => ["Male", "Female", "Male"],
        )
        .unwrap();

        let summary = describe_numeric(&df).unwrap();
        assert_eq!(summary.height(), 1);

        let features: Vec<&str> = summary
            .column("feature")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(features, vec!["age"]);

        let means: Vec<f64> = summary.column("mean").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(means, vec![30.0]);
    }

    #[test]
    fn test_profile_highlights_direction() {
        let df = df!(
            "age" => [20i64, 20, 60, 60],
            "debt_amount" => [100.0, 100.0, 1000.0, 1000.0],
        )
        .unwrap();
        let labels = Array1::from(vec![0i64, 0, 1, 1]);
        let profiles = cluster_profiles(&df, &labels, "K-Means").unwrap();

        let highlights = profile_highlights(&df, &profiles, 3).unwrap();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].cluster, 0);
        assert_eq!(highlights[0].n_customers, 2);
        assert!(highlights[0].notes.iter().any(|n| n.contains("below")));
        assert!(highlights[1].notes.iter().any(|n| n.contains("above")));
    }
}
