//! Debtseg: delinquent-debtor customer segmentation CLI
//!
//! This is the main entrypoint that orchestrates data generation,
//! preprocessing, clustering, evaluation, visualization and reporting.

use anyhow::Result;
use clap::Parser;
use debtseg::evaluation::{self, Evaluation};
use debtseg::model::count_clusters;
use debtseg::preprocessing::normalize_for_radar;
use debtseg::report::{self, ChartPaths, ProfileCard, ReportInputs, ScatterChart};
use debtseg::{
    find_optimal_k, fit_dbscan, fit_kmeans, load_or_generate, select_features, standardize, viz,
    AgglomerativeClustering, Args,
};
use ndarray::Array1;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    if args.verbose {
        println!("Debtseg - Delinquent-Debtor Customer Segmentation");
        println!("=================================================\n");
    }

    run_pipeline(&args)
}

/// Run the full segmentation pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Full Segmentation Pipeline ===\n");

    let start_time = Instant::now();
    std::fs::create_dir_all(&args.output_dir)?;

    // Step 1: Load or generate the customer base
    if args.verbose {
        println!("Step 1: Loading customer data");
        println!("  Data file: {}", args.data);
    }

    let data_start = Instant::now();
    let (df, generated) = load_or_generate(&args.data, args.customers, args.seed)?;
    if generated {
        println!(
            "✓ No file at '{}': generated {} synthetic customers (seed {})",
            args.data,
            df.height(),
            args.seed
        );
    } else {
        println!("✓ Loaded {} customers from '{}'", df.height(), args.data);
    }
    if args.verbose {
        println!("  Processing time: {:.2}s", data_start.elapsed().as_secs_f64());
    }

    // Step 2: Preprocessing
    if args.verbose {
        println!("\nStep 2: Selecting and standardizing features");
    }
    let features = select_features(&df)?;
    let (standardized, _scaler) = standardize(&features.modeling)?;
    println!(
        "✓ Features prepared: {} numeric, {} after one-hot encoding",
        features.numeric_names.len(),
        features.modeling_names.len()
    );
    if args.verbose {
        println!("  Modeling matrix shape: {:?}", standardized.shape());
    }

    // Step 3: Exploratory charts
    let correlation_png = image_path(&args.output_dir, "correlation_matrix.png");
    let distributions_png = image_path(&args.output_dir, "distributions.png");
    viz::plot_correlation_heatmap(&features.numeric, &features.numeric_names, &correlation_png)?;
    viz::plot_distribution_grid(&features.numeric, &features.numeric_names, &distributions_png)?;

    // Step 4: Optimal-K sweep
    let sweep = if args.skip_sweep {
        println!("\nK sweep skipped (--skip-sweep)");
        None
    } else {
        if args.verbose {
            println!("\nStep 3: Sweeping K from 2 to {}", args.max_k);
        }
        let sweep_start = Instant::now();
        let sweep = find_optimal_k(
            &standardized,
            args.max_k,
            args.max_iters,
            args.tolerance,
            args.seed,
            args.sample_size,
        )?;
        println!(
            "✓ K sweep complete ({} fits in {:.2}s)",
            sweep.ks.len(),
            sweep_start.elapsed().as_secs_f64()
        );
        viz::plot_elbow_curve(&sweep, &image_path(&args.output_dir, "elbow_method.png"))?;
        viz::plot_silhouette_curve(&sweep, &image_path(&args.output_dir, "silhouette_scores.png"))?;
        Some(sweep)
    };
    println!("\nNumber of clusters chosen for the analysis: {}", args.clusters);

    // Step 5: Fit the three models
    if args.verbose {
        println!("\nStep 4: Fitting clustering models");
    }
    let model_start = Instant::now();

    let kmeans = fit_kmeans(
        &standardized,
        args.clusters,
        args.max_iters,
        args.tolerance,
        args.seed,
    )?;
    println!("✓ K-Means fitted with {} clusters (inertia {:.2})", kmeans.n_clusters, kmeans.inertia);

    let hierarchical_labels = AgglomerativeClustering::new(args.clusters).fit_predict(&standardized)?;
    println!("✓ Hierarchical clustering fitted with {} clusters", args.clusters);

    let dbscan = fit_dbscan(&standardized, args.eps, args.min_samples)?;
    println!(
        "✓ DBSCAN fitted with eps={} and min_samples={}: {} clusters, {} noise points",
        args.eps, args.min_samples, dbscan.n_clusters, dbscan.n_noise
    );
    if args.verbose {
        println!("  Model fitting time: {:.2}s", model_start.elapsed().as_secs_f64());
    }

    let models: [(&str, &Array1<i64>); 3] = [
        ("K-Means", &kmeans.labels),
        ("Hierarchical", &hierarchical_labels),
        ("DBSCAN", &dbscan.labels),
    ];

    // Step 6: Evaluation
    println!("\n=== Model Evaluation ===");
    let evaluation = evaluation::evaluate_models(&standardized, &models, args.sample_size)?;
    print_scores(&evaluation);

    // Step 7: PCA scatter per surviving model, sizes for K-Means
    if args.verbose {
        println!("\nStep 5: Generating cluster visualizations");
    }
    let mut scatters = Vec::new();
    for &(name, labels) in &models {
        let (n_clusters, _) = count_clusters(labels);
        if n_clusters < 2 {
            println!("PCA scatter skipped for '{}' (fewer than 2 clusters)", name);
            continue;
        }
        let file = format!("clusters_pca_{}.png", name.to_lowercase());
        viz::plot_pca_scatter(&standardized, labels, name, &image_path(&args.output_dir, &file))?;
        scatters.push(ScatterChart {
            model: name.to_string(),
            image: file,
        });
    }
    let sizes_png = "cluster_sizes.png";
    viz::plot_cluster_sizes(&kmeans.labels, "K-Means", &image_path(&args.output_dir, sizes_png))?;

    // Step 8: Cluster profiles on the original scale (K-Means)
    println!("\n=== Cluster Profiles (K-Means) ===");
    let profiles = evaluation::cluster_profiles(&df, &kmeans.labels, "K-Means")?;
    println!("{}", profiles);

    let (radar_features, radar_rows) = normalize_for_radar(&profiles)?;
    let mut cards = Vec::new();
    let highlights = evaluation::profile_highlights(&df, &profiles, 3)?;
    for ((cluster, values), highlight) in radar_rows.iter().zip(highlights.iter()) {
        let file = format!("radar_cluster_{}.png", cluster);
        viz::plot_radar_chart(
            &radar_features,
            values,
            *cluster,
            &image_path(&args.output_dir, &file),
        )?;
        cards.push(ProfileCard {
            cluster: highlight.cluster,
            n_customers: highlight.n_customers,
            notes: highlight.notes.clone(),
            radar: file,
        });
    }

    // Step 9: HTML report
    let report_inputs = ReportInputs {
        data_path: &args.data,
        generated,
        row_count: df.height(),
        k: args.clusters,
        eps: args.eps,
        min_samples: args.min_samples,
        seed: args.seed,
        sample: report::table_from_frame(&df, 5)?,
        summary: report::table_from_frame(&evaluation::describe_numeric(&df)?, 32)?,
        evaluation: &evaluation,
        profile: report::table_from_frame(&profiles, 32)?,
        cards,
        charts: ChartPaths {
            correlation: "correlation_matrix.png".to_string(),
            distributions: "distributions.png".to_string(),
            elbow: sweep.as_ref().map(|_| "elbow_method.png".to_string()),
            silhouette: sweep.as_ref().map(|_| "silhouette_scores.png".to_string()),
            scatters,
            sizes: sizes_png.to_string(),
        },
    };
    report::render_report(&report_inputs, &image_path(&args.output_dir, "report.html"))?;

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Charts and report saved under: {}", args.output_dir);
    Ok(())
}

/// Print the evaluation table and any skipped models
fn print_scores(evaluation: &Evaluation) {
    println!("  Model        | Silhouette | Davies-Bouldin | Clusters | Noise");
    println!("  -------------|------------|----------------|----------|------");
    for s in &evaluation.scores {
        println!(
            "  {:<12} | {:>10.3} | {:>14.3} | {:>8} | {:>5}",
            s.model, s.silhouette, s.davies_bouldin, s.n_clusters, s.n_noise
        );
    }
    for name in &evaluation.skipped {
        println!("  {:<12} | skipped: fewer than 2 clusters found", name);
    }
}

fn image_path(dir: &str, name: &str) -> String {
    Path::new(dir).join(name).to_string_lossy().into_owned()
}
