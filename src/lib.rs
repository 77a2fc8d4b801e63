//! Debtseg: customer segmentation for delinquent-debtor portfolios
//!
//! This library generates a synthetic base of delinquent customers
//! (sociodemographic and credit-behavior fields), segments it with K-Means,
//! agglomerative and DBSCAN clustering, scores the segmentations with
//! internal metrics, and renders charts plus a static HTML report.

pub mod cli;
pub mod evaluation;
pub mod generator;
pub mod hierarchy;
pub mod model;
pub mod preprocessing;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use generator::{generate_customers, load_or_generate};
pub use hierarchy::{AgglomerativeClustering, Linkage};
pub use model::{find_optimal_k, fit_dbscan, fit_kmeans, DbscanOutcome, KMeansModel, KSweep};
pub use preprocessing::{select_features, standardize, FeatureSet, StandardScaler};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
