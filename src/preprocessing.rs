//! Feature selection, one-hot encoding and standardization

use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::collections::BTreeSet;

/// Feature matrices extracted from the raw customer frame.
///
/// `numeric` keeps the original, unscaled numeric columns for correlation,
/// distribution and profile analysis. `modeling` is what the clustering
/// models consume: numeric columns plus one-hot indicators for every
/// categorical column.
#[derive(Debug)]
pub struct FeatureSet {
    pub numeric: Array2<f64>,
    pub numeric_names: Vec<String>,
    pub modeling: Array2<f64>,
    pub modeling_names: Vec<String>,
}

/// Split the customer frame into the numeric analysis matrix and the
/// one-hot-encoded modeling matrix. `customer_id` is an identifier, not a
/// feature, and is dropped from both.
pub fn select_features(df: &DataFrame) -> crate::Result<FeatureSet> {
    if df.height() == 0 {
        anyhow::bail!("Cannot select features from an empty frame");
    }

    let n_rows = df.height();
    let mut numeric_columns: Vec<(String, Vec<f64>)> = Vec::new();
    let mut categorical_columns: Vec<(String, Vec<String>)> = Vec::new();

    for series in df.get_columns() {
        let name = series.name();
        if name == "customer_id" {
            continue;
        }
        if series.null_count() > 0 {
            anyhow::bail!("Column '{}' contains null values", name);
        }
        if series.dtype().is_numeric() {
            let values: Vec<f64> = series
                .cast(&DataType::Float64)?
                .f64()?
                .into_no_null_iter()
                .collect();
            numeric_columns.push((name.to_string(), values));
        } else if series.dtype() == &DataType::String {
            let values: Vec<String> = series
                .str()?
                .into_no_null_iter()
                .map(|v| v.to_string())
                .collect();
            categorical_columns.push((name.to_string(), values));
        }
    }

    if numeric_columns.is_empty() {
        anyhow::bail!("No numeric feature columns found");
    }

    let numeric_names: Vec<String> = numeric_columns.iter().map(|(name, _)| name.clone()).collect();
    let mut numeric = Array2::zeros((n_rows, numeric_columns.len()));
    for (j, (_, values)) in numeric_columns.iter().enumerate() {
        for (i, &value) in values.iter().enumerate() {
            numeric[[i, j]] = value;
        }
    }

    // Modeling matrix: numeric features first, then one indicator column per
    // category value. Category vocabularies are sorted so the encoding is
    // stable across runs and reloads.
    let mut modeling_names = numeric_names.clone();
    let mut modeling_columns: Vec<Vec<f64>> =
        numeric_columns.iter().map(|(_, values)| values.clone()).collect();

    for (name, values) in &categorical_columns {
        let vocabulary: BTreeSet<&str> = values.iter().map(|v| v.as_str()).collect();
        for category in vocabulary {
            let indicator: Vec<f64> = values
                .iter()
                .map(|v| if v == category { 1.0 } else { 0.0 })
                .collect();
            modeling_names.push(format!("{}_{}", name, category));
            modeling_columns.push(indicator);
        }
    }

    let mut modeling = Array2::zeros((n_rows, modeling_columns.len()));
    for (j, values) in modeling_columns.iter().enumerate() {
        for (i, &value) in values.iter().enumerate() {
            modeling[[i, j]] = value;
        }
    }

    Ok(FeatureSet {
        numeric,
        numeric_names,
        modeling,
        modeling_names,
    })
}

/// Per-column standardization to zero mean and unit variance
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    pub stds: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and standard deviations
    pub fn fit(data: &Array2<f64>) -> crate::Result<Self> {
        if data.nrows() == 0 {
            anyhow::bail!("Cannot fit a scaler on an empty matrix");
        }
        let means = data
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow::anyhow!("Failed to compute column means"))?;
        let stds = data.std_axis(Axis(0), 0.0);
        Ok(StandardScaler { means, stds })
    }

    /// Scale a matrix with the fitted statistics. Constant columns map to
    /// zero instead of dividing by a zero standard deviation.
    pub fn transform(&self, data: &Array2<f64>) -> crate::Result<Array2<f64>> {
        if data.ncols() != self.means.len() {
            anyhow::bail!(
                "Matrix has {} columns but the scaler was fitted on {}",
                data.ncols(),
                self.means.len()
            );
        }
        let mut scaled = data.clone();
        for (j, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            for value in column.iter_mut() {
                *value = if std > f64::EPSILON { (*value - mean) / std } else { 0.0 };
            }
        }
        Ok(scaled)
    }
}

/// Fit a scaler and standardize the matrix in one step
pub fn standardize(data: &Array2<f64>) -> crate::Result<(Array2<f64>, StandardScaler)> {
    let scaler = StandardScaler::fit(data)?;
    let scaled = scaler.transform(data)?;
    Ok((scaled, scaler))
}

/// Min-max normalize cluster-profile feature means to [0, 1] per feature so
/// radar charts share one scale. Expects the profile frame produced by
/// `evaluation::cluster_profiles`; the `cluster` and `n_customers` columns
/// are carried through untouched as the row key.
pub fn normalize_for_radar(profiles: &DataFrame) -> crate::Result<(Vec<String>, Vec<(i64, Vec<f64>)>)> {
    let clusters: Vec<i64> = profiles
        .column("cluster")?
        .i64()?
        .into_no_null_iter()
        .collect();

    let mut feature_names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for series in profiles.get_columns() {
        let name = series.name();
        if name == "cluster" || name == "n_customers" {
            continue;
        }
        let values: Vec<f64> = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_no_null_iter()
            .collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        let normalized = values
            .iter()
            .map(|&v| if span > f64::EPSILON { (v - min) / span } else { 0.5 })
            .collect();
        feature_names.push(name.to_string());
        columns.push(normalized);
    }

    let rows = clusters
        .iter()
        .enumerate()
        .map(|(i, &cluster)| (cluster, columns.iter().map(|col| col[i]).collect()))
        .collect();

    Ok((feature_names, rows))
}
