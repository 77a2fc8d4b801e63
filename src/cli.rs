//! Command-line interface definitions and argument parsing

use clap::Parser;

/// Delinquent-debtor segmentation CLI using K-Means, agglomerative and DBSCAN clustering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the customer CSV file (generated on first run if missing)
    #[arg(short, long, default_value = "customers.csv")]
    pub data: String,

    /// Directory for generated charts and the HTML report
    #[arg(short, long, default_value = "images")]
    pub output_dir: String,

    /// Number of synthetic customers to generate when no CSV exists
    #[arg(short = 'n', long, default_value = "2000")]
    pub customers: usize,

    /// Seed for the synthetic data generator and K-Means initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Number of clusters for K-Means and agglomerative clustering
    #[arg(short = 'k', long, default_value = "4")]
    pub clusters: usize,

    /// Upper bound of the K range swept by the elbow/silhouette analysis
    #[arg(long, default_value = "10")]
    pub max_k: usize,

    /// DBSCAN neighborhood radius in standardized feature space
    #[arg(long, default_value = "2.5")]
    pub eps: f64,

    /// DBSCAN minimum neighborhood size for a core point
    #[arg(long, default_value = "20")]
    pub min_samples: usize,

    /// Maximum number of points used for silhouette computation
    #[arg(long, default_value = "2000")]
    pub sample_size: usize,

    /// Maximum iterations for K-Means
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Skip the optimal-K sweep (elbow and silhouette curves)
    #[arg(long)]
    pub skip_sweep: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate parameter combinations before the pipeline starts
    pub fn validate(&self) -> crate::Result<()> {
        if self.customers < 10 {
            anyhow::bail!(
                "At least 10 customers are required for a meaningful segmentation, got {}",
                self.customers
            );
        }
        if self.clusters < 2 {
            anyhow::bail!("Number of clusters must be at least 2, got {}", self.clusters);
        }
        if self.max_k < 2 {
            anyhow::bail!("max-k must be at least 2, got {}", self.max_k);
        }
        if self.clusters > self.max_k {
            anyhow::bail!(
                "Number of clusters ({}) exceeds the swept range (max-k = {})",
                self.clusters,
                self.max_k
            );
        }
        if self.eps <= 0.0 {
            anyhow::bail!("eps must be positive, got {}", self.eps);
        }
        if self.min_samples == 0 {
            anyhow::bail!("min-samples must be at least 1");
        }
        if self.sample_size < 2 {
            anyhow::bail!("sample-size must be at least 2, got {}", self.sample_size);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args {
            data: "customers.csv".to_string(),
            output_dir: "images".to_string(),
            customers: 2000,
            seed: 42,
            clusters: 4,
            max_k: 10,
            eps: 2.5,
            min_samples: 20,
            sample_size: 2000,
            max_iters: 300,
            tolerance: 1e-4,
            skip_sweep: false,
            verbose: false,
        }
    }

    #[test]
    fn test_validate_defaults() {
        assert!(default_args().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let mut args = default_args();
        args.clusters = 1;
        assert!(args.validate().is_err());

        let mut args = default_args();
        args.eps = 0.0;
        assert!(args.validate().is_err());

        let mut args = default_args();
        args.min_samples = 0;
        assert!(args.validate().is_err());

        let mut args = default_args();
        args.clusters = 12;
        assert!(args.validate().is_err());

        let mut args = default_args();
        args.customers = 5;
        assert!(args.validate().is_err());
    }
}
