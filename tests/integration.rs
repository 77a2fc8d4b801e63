//! Integration tests for Debtseg

use debtseg::evaluation::{cluster_profiles, evaluate_models, profile_highlights};
use debtseg::preprocessing::normalize_for_radar;
use debtseg::report::{self, ChartPaths, ProfileCard, ReportInputs};
use debtseg::{
    find_optimal_k, fit_dbscan, fit_kmeans, generate_customers, load_or_generate, select_features,
    standardize, AgglomerativeClustering,
};
use ndarray::Array1;
use tempfile::tempdir;

const N_CUSTOMERS: usize = 300;
const SEED: u64 = 42;

#[test]
fn test_end_to_end_pipeline() {
    // Generate and preprocess
    let df = generate_customers(N_CUSTOMERS, SEED).unwrap();
    let features = select_features(&df).unwrap();
    let (standardized, _) = standardize(&features.modeling).unwrap();

    assert_eq!(standardized.nrows(), N_CUSTOMERS);
    assert_eq!(standardized.ncols(), features.modeling_names.len());

    // Fit all three models
    let kmeans = fit_kmeans(&standardized, 4, 100, 1e-4, SEED).unwrap();
    assert_eq!(kmeans.labels.len(), N_CUSTOMERS);
    assert_eq!(kmeans.centroids.nrows(), 4);
    assert_eq!(kmeans.cluster_sizes().iter().sum::<usize>(), N_CUSTOMERS);
    assert!(kmeans.labels.iter().all(|&l| (0..4).contains(&l)));

    let hierarchical = AgglomerativeClustering::new(4).fit_predict(&standardized).unwrap();
    let mut distinct: Vec<i64> = hierarchical.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 4);

    let dbscan = fit_dbscan(&standardized, 3.0, 10).unwrap();
    assert_eq!(dbscan.labels.len(), N_CUSTOMERS);
    let noise = dbscan.labels.iter().filter(|&&l| l == -1).count();
    assert_eq!(noise, dbscan.n_noise);

    // Evaluate: K-Means and hierarchical always survive the 2-cluster guard
    let models: [(&str, &Array1<i64>); 3] = [
        ("K-Means", &kmeans.labels),
        ("Hierarchical", &hierarchical),
        ("DBSCAN", &dbscan.labels),
    ];
    let evaluation = evaluate_models(&standardized, &models, N_CUSTOMERS).unwrap();
    assert_eq!(evaluation.scores.len() + evaluation.skipped.len(), 3);
    assert!(evaluation.scores.iter().any(|s| s.model == "K-Means"));
    assert!(evaluation.scores.iter().any(|s| s.model == "Hierarchical"));
    for score in &evaluation.scores {
        assert!((-1.0..=1.0).contains(&score.silhouette), "{:?}", score);
        assert!(score.davies_bouldin >= 0.0, "{:?}", score);
        assert!(score.n_clusters >= 2);
    }
}

#[test]
fn test_k_sweep_shape_and_monotonicity() {
    let df = generate_customers(150, SEED).unwrap();
    let features = select_features(&df).unwrap();
    let (standardized, _) = standardize(&features.modeling).unwrap();

    let sweep = find_optimal_k(&standardized, 6, 100, 1e-4, SEED, 150).unwrap();
    assert_eq!(sweep.ks, vec![2, 3, 4, 5, 6]);
    assert_eq!(sweep.inertias.len(), 5);
    assert_eq!(sweep.silhouettes.len(), 5);

    // Inertia decreases (up to tolerance) as K grows
    assert!(sweep.inertias.first().unwrap() >= sweep.inertias.last().unwrap());
    assert!(sweep.inertias.iter().all(|v| v.is_finite()));
    assert!(sweep.silhouettes.iter().all(|v| (-1.0..=1.0).contains(v)));
}

#[test]
fn test_profiles_radar_and_highlights() {
    let df = generate_customers(N_CUSTOMERS, SEED).unwrap();
    let features = select_features(&df).unwrap();
    let (standardized, _) = standardize(&features.modeling).unwrap();
    let kmeans = fit_kmeans(&standardized, 4, 100, 1e-4, SEED).unwrap();

    let profiles = cluster_profiles(&df, &kmeans.labels, "K-Means").unwrap();
    assert!(profiles.height() >= 2);
    assert!(profiles.column("customer_id").is_err());

    let counts: i64 = profiles
        .column("n_customers")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .sum();
    assert_eq!(counts, N_CUSTOMERS as i64);

    let (radar_features, radar_rows) = normalize_for_radar(&profiles).unwrap();
    assert!(radar_features.len() >= 3);
    assert_eq!(radar_rows.len(), profiles.height());
    for (_, values) in &radar_rows {
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    let highlights = profile_highlights(&df, &profiles, 3).unwrap();
    assert_eq!(highlights.len(), profiles.height());
    assert!(highlights.iter().all(|h| !h.notes.is_empty()));
}

#[test]
fn test_csv_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("customers.csv");
    let path = path.to_str().unwrap();

    let (df, generated) = load_or_generate(path, 120, SEED).unwrap();
    assert!(generated);

    let (reloaded, generated) = load_or_generate(path, 999, 7).unwrap();
    assert!(!generated);
    assert_eq!(reloaded.height(), df.height());

    // The reloaded frame feeds the same preprocessing
    let original = select_features(&df).unwrap();
    let roundtrip = select_features(&reloaded).unwrap();
    assert_eq!(original.modeling_names, roundtrip.modeling_names);
    assert_eq!(original.modeling.shape(), roundtrip.modeling.shape());
}

#[test]
fn test_report_from_pipeline_outputs() {
    let df = generate_customers(100, SEED).unwrap();
    let features = select_features(&df).unwrap();
    let (standardized, _) = standardize(&features.modeling).unwrap();
    let kmeans = fit_kmeans(&standardized, 3, 100, 1e-4, SEED).unwrap();

    let models: [(&str, &Array1<i64>); 1] = [("K-Means", &kmeans.labels)];
    let evaluation = evaluate_models(&standardized, &models, 100).unwrap();
    let profiles = cluster_profiles(&df, &kmeans.labels, "K-Means").unwrap();
    let highlights = profile_highlights(&df, &profiles, 3).unwrap();

    let cards: Vec<ProfileCard> = highlights
        .iter()
        .map(|h| ProfileCard {
            cluster: h.cluster,
            n_customers: h.n_customers,
            notes: h.notes.clone(),
            radar: format!("radar_cluster_{}.png", h.cluster),
        })
        .collect();

    let inputs = ReportInputs {
        data_path: "customers.csv",
        generated: true,
        row_count: df.height(),
        k: 3,
        eps: 2.5,
        min_samples: 20,
        seed: SEED,
        sample: report::table_from_frame(&df.head(Some(5)), 5).unwrap(),
        summary: report::table_from_frame(
            &debtseg::evaluation::describe_numeric(&df).unwrap(),
            32,
        )
        .unwrap(),
        evaluation: &evaluation,
        profile: report::table_from_frame(&profiles, 32).unwrap(),
        cards,
        charts: ChartPaths {
            correlation: "correlation_matrix.png".to_string(),
            distributions: "distributions.png".to_string(),
            elbow: None,
            silhouette: None,
            scatters: Vec::new(),
            sizes: "cluster_sizes.png".to_string(),
        },
    };

    let dir = tempdir().unwrap();
    let report_path = dir.path().join("report.html");
    report::render_report(&inputs, report_path.to_str().unwrap()).unwrap();

    let html = std::fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("Delinquent-Debtor Customer Segmentation"));
    assert!(html.contains("K = 3"));
    assert!(html.contains("monthly_income"));
}
