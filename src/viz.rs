//! Visualization functions using Plotters for cluster analysis

use crate::model::{KSweep, NOISE};
use linfa::prelude::*;
use linfa_reduction::Pca;
use ndarray::{Array1, Array2, Axis};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Color palette for different clusters
const CLUSTER_COLORS: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const NOISE_COLOR: RGBColor = RGBColor(170, 170, 170);
const BAR_COLOR: RGBColor = RGBColor(65, 105, 225);

fn cluster_color(label: i64) -> RGBColor {
    if label < 0 {
        NOISE_COLOR
    } else {
        CLUSTER_COLORS[label as usize % CLUSTER_COLORS.len()]
    }
}

fn cluster_name(label: i64) -> String {
    if label == NOISE {
        "Noise".to_string()
    } else {
        format!("Cluster {}", label)
    }
}

/// Pearson correlation matrix of the columns of `data`. Constant columns
/// correlate 0 with everything except themselves.
pub fn correlation_matrix(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows() as f64;
    let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(data.ncols()));
    let stds = data.std_axis(Axis(0), 0.0);
    let n_cols = data.ncols();

    let mut corr = Array2::zeros((n_cols, n_cols));
    for i in 0..n_cols {
        for j in i..n_cols {
            let value = if i == j {
                1.0
            } else if stds[i] <= f64::EPSILON || stds[j] <= f64::EPSILON {
                0.0
            } else {
                let covariance = data
                    .column(i)
                    .iter()
                    .zip(data.column(j).iter())
                    .map(|(a, b)| (a - means[i]) * (b - means[j]))
                    .sum::<f64>()
                    / n;
                covariance / (stds[i] * stds[j])
            };
            corr[[i, j]] = value;
            corr[[j, i]] = value;
        }
    }
    corr
}

/// Blue-white-red diverging scale for correlation cells, clamped to [-1, 1]
fn diverging_color(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    if v >= 0.0 {
        let fade = (255.0 * (1.0 - v)) as u8;
        RGBColor(255, fade, fade)
    } else {
        let fade = (255.0 * (1.0 + v)) as u8;
        RGBColor(fade, fade, 255)
    }
}

/// Annotated correlation heatmap of the numeric analysis columns
pub fn plot_correlation_heatmap(
    data: &Array2<f64>,
    names: &[String],
    output_path: &str,
) -> crate::Result<()> {
    let corr = correlation_matrix(data);
    let n = names.len();
    if n == 0 || corr.nrows() != n {
        anyhow::bail!("Correlation heatmap needs at least one named column");
    }

    let root = BitMapBackend::new(output_path, (900, 780)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation Matrix of Numeric Features", ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(130)
        .build_cartesian_2d(0f64..n as f64, 0f64..n as f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n + 1)
        .y_labels(n + 1)
        .x_label_formatter(&|v| edge_label(names, *v))
        .y_label_formatter(&|v| edge_label(names, *v))
        .x_label_style(("sans-serif", 12))
        .y_label_style(("sans-serif", 12))
        .draw()?;

    for i in 0..n {
        for j in 0..n {
            let value = corr[[i, j]];
            chart.draw_series(std::iter::once(Rectangle::new(
                [(j as f64, i as f64), (j as f64 + 1.0, i as f64 + 1.0)],
                diverging_color(value).filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.2}", value),
                (j as f64 + 0.28, i as f64 + 0.55),
                ("sans-serif", 13),
            )))?;
        }
    }

    root.present()?;
    println!("Correlation heatmap saved to: {}", output_path);
    Ok(())
}

/// Tick labels land on cell edges; name the cell to the tick's right/top
fn edge_label(names: &[String], v: f64) -> String {
    let index = v.round();
    if (v - index).abs() < 0.01 && index >= 0.0 && (index as usize) < names.len() {
        names[index as usize].clone()
    } else {
        String::new()
    }
}

/// Grid of 50-bin histograms, one per numeric column
pub fn plot_distribution_grid(
    data: &Array2<f64>,
    names: &[String],
    output_path: &str,
) -> crate::Result<()> {
    let n_plots = names.len();
    if n_plots == 0 || data.ncols() != n_plots {
        anyhow::bail!("Distribution grid needs at least one named column");
    }

    let n_cols = 2usize;
    let n_rows = (n_plots + n_cols - 1) / n_cols;
    let root = BitMapBackend::new(output_path, (1300, (n_rows as u32) * 330)).into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((n_rows, n_cols));

    for (index, name) in names.iter().enumerate() {
        let values: Vec<f64> = data.column(index).to_vec();
        let (bins, min, width) = histogram_bins(&values, 50);
        let max_count = *bins.iter().max().unwrap_or(&1) as f64;

        let mut chart = ChartBuilder::on(&areas[index])
            .caption(format!("Distribution of {}", name), ("sans-serif", 17))
            .margin(12)
            .x_label_area_size(30)
            .y_label_area_size(45)
            .build_cartesian_2d(min..min + width * 50.0, 0f64..max_count * 1.15)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_style(("sans-serif", 11))
            .y_label_style(("sans-serif", 11))
            .draw()?;

        chart.draw_series(bins.iter().enumerate().map(|(b, &count)| {
            let x0 = min + b as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, count as f64)], BAR_COLOR.filled())
        }))?;
    }

    root.present()?;
    println!("Distribution grid saved to: {}", output_path);
    Ok(())
}

fn histogram_bins(values: &[f64], n_bins: usize) -> (Vec<usize>, f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let (min, max) = if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (max - min) / n_bins as f64;

    let mut bins = vec![0usize; n_bins];
    for &value in values {
        let bin = (((value - min) / width) as usize).min(n_bins - 1);
        bins[bin] += 1;
    }
    (bins, min, width)
}

/// Elbow-method curve: K against within-cluster sum of squares
pub fn plot_elbow_curve(sweep: &KSweep, output_path: &str) -> crate::Result<()> {
    plot_sweep_curve(
        sweep.ks.as_slice(),
        sweep.inertias.as_slice(),
        "Elbow Method for Optimal K",
        "Inertia (WCSS)",
        BLUE,
        output_path,
    )
}

/// Mean silhouette against K from the same sweep
pub fn plot_silhouette_curve(sweep: &KSweep, output_path: &str) -> crate::Result<()> {
    plot_sweep_curve(
        sweep.ks.as_slice(),
        sweep.silhouettes.as_slice(),
        "Silhouette Analysis for Optimal K",
        "Mean Silhouette Coefficient",
        RED,
        output_path,
    )
}

fn plot_sweep_curve(
    ks: &[usize],
    values: &[f64],
    title: &str,
    y_label: &str,
    color: RGBColor,
    output_path: &str,
) -> crate::Result<()> {
    if ks.is_empty() || ks.len() != values.len() {
        anyhow::bail!("Sweep curve needs one value per K");
    }

    let min_v = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_v = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pad = ((max_v - min_v) * 0.1).max(1e-6);

    let root = BitMapBackend::new(output_path, (800, 520)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (ks[0] as f64 - 0.3)..(ks[ks.len() - 1] as f64 + 0.3),
            (min_v - pad)..(max_v + pad),
        )?;

    chart
        .configure_mesh()
        .x_desc("Number of Clusters (K)")
        .y_desc(y_label)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        ks.iter().zip(values.iter()).map(|(&k, &v)| (k as f64, v)),
        &color,
    ))?;
    chart.draw_series(
        ks.iter()
            .zip(values.iter())
            .map(|(&k, &v)| Circle::new((k as f64, v), 4, color.filled())),
    )?;

    root.present()?;
    println!("Sweep curve saved to: {}", output_path);
    Ok(())
}

/// Project the standardized modeling matrix onto its first two principal
/// components. Returns the (n, 2) coordinates and the explained-variance
/// ratio of the two components.
pub fn project_pca(data: &Array2<f64>) -> crate::Result<(Array2<f64>, Vec<f64>)> {
    if data.ncols() < 2 || data.nrows() < 2 {
        anyhow::bail!("PCA projection needs at least 2 rows and 2 columns");
    }

    let targets: Array1<usize> = Array1::zeros(data.nrows());
    let dataset = Dataset::new(data.clone(), targets);
    let pca = Pca::params(2).fit(&dataset)?;
    let coords = pca.predict(data);
    let ratio = pca.explained_variance_ratio().to_vec();
    Ok((coords, ratio))
}

/// 2D PCA scatter of one model's clusters; noise points are drawn grey
pub fn plot_pca_scatter(
    data: &Array2<f64>,
    labels: &Array1<i64>,
    model_name: &str,
    output_path: &str,
) -> crate::Result<()> {
    if data.nrows() != labels.len() {
        anyhow::bail!(
            "PCA scatter got {} points but {} labels",
            data.nrows(),
            labels.len()
        );
    }

    let (coords, ratio) = project_pca(data)?;
    let xs: Vec<f64> = coords.column(0).to_vec();
    let ys: Vec<f64> = coords.column(1).to_vec();

    let x_min = xs.iter().cloned().fold(f64::INFINITY, f64::min) - 0.5;
    let x_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 0.5;
    let y_min = ys.iter().cloned().fold(f64::INFINITY, f64::min) - 0.5;
    let y_max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 0.5;

    let root = BitMapBackend::new(output_path, (820, 620)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} Clusters (PCA Projection)", model_name), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(format!("PC1 ({:.1}% of variance)", ratio[0] * 100.0))
        .y_desc(format!("PC2 ({:.1}% of variance)", ratio[1] * 100.0))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut present: Vec<i64> = labels.iter().copied().collect();
    present.sort_unstable();
    present.dedup();

    for &label in &present {
        let color = cluster_color(label);
        chart
            .draw_series(
                labels
                    .iter()
                    .enumerate()
                    .filter(|(_, &l)| l == label)
                    .map(|(i, _)| Circle::new((xs[i], ys[i]), 3, color.filled())),
            )?
            .label(cluster_name(label))
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("PCA scatter for {} saved to: {}", model_name, output_path);
    Ok(())
}

/// Bar chart of cluster sizes, including the noise bucket when present
pub fn plot_cluster_sizes(
    labels: &Array1<i64>,
    model_name: &str,
    output_path: &str,
) -> crate::Result<()> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &label in labels.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    if counts.is_empty() {
        anyhow::bail!("Cluster size chart needs at least one label");
    }

    let entries: Vec<(i64, usize)> = counts.into_iter().collect();
    let max_size = entries.iter().map(|&(_, c)| c).max().unwrap_or(1) as f64;

    let root = BitMapBackend::new(output_path, (640, 440)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} Cluster Sizes", model_name), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.6f64..entries.len() as f64 - 0.4, 0f64..max_size * 1.1)?;

    let names: Vec<String> = entries.iter().map(|&(label, _)| cluster_name(label)).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(entries.len())
        .x_label_formatter(&|v| {
            let index = v.round();
            if (v - index).abs() < 0.01 && index >= 0.0 && (index as usize) < names.len() {
                names[index as usize].clone()
            } else {
                String::new()
            }
        })
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(entries.iter().enumerate().map(|(index, &(label, count))| {
        Rectangle::new(
            [(index as f64 - 0.4, 0.0), (index as f64 + 0.4, count as f64)],
            cluster_color(label).filled(),
        )
    }))?;

    root.present()?;
    println!("Cluster size chart saved to: {}", output_path);
    Ok(())
}

/// Radar chart of one cluster's min-max-normalized feature means
pub fn plot_radar_chart(
    feature_names: &[String],
    values: &[f64],
    cluster: i64,
    output_path: &str,
) -> crate::Result<()> {
    if feature_names.len() != values.len() || feature_names.len() < 3 {
        anyhow::bail!("Radar chart needs at least 3 named features");
    }

    let n = feature_names.len();
    let angle = |index: usize| PI / 2.0 - 2.0 * PI * index as f64 / n as f64;

    let root = BitMapBackend::new(output_path, (620, 620)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Profile of Cluster {}", cluster), ("sans-serif", 22))
        .margin(10)
        .build_cartesian_2d(-1.45f64..1.45f64, -1.45f64..1.45f64)?;

    // Reference rings and spokes instead of a cartesian mesh
    let grid = RGBColor(205, 205, 205);
    for ring in [0.25, 0.5, 0.75, 1.0] {
        chart.draw_series(LineSeries::new(
            (0..=64).map(|t| {
                let theta = 2.0 * PI * t as f64 / 64.0;
                (ring * theta.cos(), ring * theta.sin())
            }),
            &grid,
        ))?;
    }
    for index in 0..n {
        let theta = angle(index);
        chart.draw_series(LineSeries::new(
            [(0.0, 0.0), (theta.cos(), theta.sin())],
            &grid,
        ))?;
    }

    let outline = RGBColor(148, 0, 211);
    let mut points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let theta = angle(index);
            (value * theta.cos(), value * theta.sin())
        })
        .collect();

    chart.draw_series(std::iter::once(Polygon::new(points.clone(), outline.mix(0.25).filled())))?;
    points.push(points[0]);
    chart.draw_series(LineSeries::new(points, outline.stroke_width(2)))?;

    for (index, name) in feature_names.iter().enumerate() {
        let theta = angle(index);
        let anchor = (1.12 * theta.cos() - 0.16, 1.12 * theta.sin());
        chart.draw_series(std::iter::once(Text::new(
            name.clone(),
            anchor,
            ("sans-serif", 13),
        )))?;
    }

    root.present()?;
    println!("Radar chart for cluster {} saved to: {}", cluster, output_path);
    Ok(())
}
