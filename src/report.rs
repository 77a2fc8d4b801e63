//! Static HTML report generation with minijinja
//!
//! The report mirrors the five analysis views: exploratory data analysis,
//! choice of K, model comparison, cluster profiles and a project record.

use crate::evaluation::Evaluation;
use minijinja::{context, Environment};
use polars::prelude::*;
use serde::Serialize;

/// A rendered table: header row plus stringified cells
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One cluster card in the profile section
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCard {
    pub cluster: i64,
    pub n_customers: i64,
    pub notes: Vec<String>,
    pub radar: String,
}

/// A PCA scatter chart for one model
#[derive(Debug, Clone, Serialize)]
pub struct ScatterChart {
    pub model: String,
    pub image: String,
}

/// Relative image paths embedded by the report
#[derive(Debug, Clone, Serialize)]
pub struct ChartPaths {
    pub correlation: String,
    pub distributions: String,
    pub elbow: Option<String>,
    pub silhouette: Option<String>,
    pub scatters: Vec<ScatterChart>,
    pub sizes: String,
}

/// Everything the report template needs
pub struct ReportInputs<'a> {
    pub data_path: &'a str,
    pub generated: bool,
    pub row_count: usize,
    pub k: usize,
    pub eps: f64,
    pub min_samples: usize,
    pub seed: u64,
    pub sample: TableData,
    pub summary: TableData,
    pub evaluation: &'a Evaluation,
    pub profile: TableData,
    pub cards: Vec<ProfileCard>,
    pub charts: ChartPaths,
}

/// Convert the first `max_rows` rows of a frame into a displayable table.
/// Floats are rounded to two decimals.
pub fn table_from_frame(df: &DataFrame, max_rows: usize) -> crate::Result<TableData> {
    let headers: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let n_rows = df.height().min(max_rows);

    let mut rows = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let mut row = Vec::with_capacity(headers.len());
        for series in df.get_columns() {
            row.push(format_value(&series.get(i)?));
        }
        rows.push(row);
    }

    Ok(TableData { headers, rows })
}

fn format_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Float64(v) => format!("{:.2}", v),
        AnyValue::Float32(v) => format!("{:.2}", v),
        AnyValue::String(v) => (*v).to_string(),
        AnyValue::StringOwned(v) => v.to_string(),
        other => other.to_string(),
    }
}

/// Render the report to `output_path`. Image paths are embedded as-is, so
/// they should be relative to the report's own directory.
pub fn render_report(inputs: &ReportInputs, output_path: &str) -> crate::Result<()> {
    let mut env = Environment::new();
    env.add_template("report", REPORT_TEMPLATE)?;
    let template = env.get_template("report")?;

    // Pre-format metric cells; templates stay free of number formatting
    let score_rows: Vec<Vec<String>> = inputs
        .evaluation
        .scores
        .iter()
        .map(|s| {
            vec![
                s.model.clone(),
                format!("{:.3}", s.silhouette),
                format!("{:.3}", s.davies_bouldin),
                s.n_clusters.to_string(),
                s.n_noise.to_string(),
            ]
        })
        .collect();

    let html = template.render(context! {
        data_path => inputs.data_path,
        generated => inputs.generated,
        row_count => inputs.row_count,
        k => inputs.k,
        eps => inputs.eps,
        min_samples => inputs.min_samples,
        seed => inputs.seed,
        sample => &inputs.sample,
        summary => &inputs.summary,
        score_rows => score_rows,
        skipped => &inputs.evaluation.skipped,
        profile => &inputs.profile,
        cards => &inputs.cards,
        charts => &inputs.charts,
    })?;

    std::fs::write(output_path, html)?;
    println!("HTML report saved to: {}", output_path);
    Ok(())
}

const REPORT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Delinquent-Debtor Customer Segmentation</title>
<style>
  body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 2rem auto; max-width: 1080px; color: #222; }
  h1 { border-bottom: 3px solid #4169e1; padding-bottom: 0.4rem; }
  h2 { margin-top: 2.4rem; border-bottom: 1px solid #ccc; padding-bottom: 0.3rem; }
  nav a { margin-right: 1rem; }
  table { border-collapse: collapse; margin: 1rem 0; font-size: 0.85rem; }
  th, td { border: 1px solid #bbb; padding: 0.3rem 0.6rem; text-align: right; }
  th { background: #eef2fb; }
  td:first-child, th:first-child { text-align: left; }
  img { max-width: 100%; margin: 0.5rem 0; border: 1px solid #ddd; }
  .row { display: flex; flex-wrap: wrap; gap: 1rem; }
  .row img { flex: 1 1 30%; min-width: 300px; }
  .card { border: 1px solid #ddd; border-radius: 6px; padding: 1rem; margin: 1rem 0; }
  .note { color: #555; font-size: 0.9rem; }
</style>
</head>
<body>
<h1>Delinquent-Debtor Customer Segmentation</h1>
<nav>
  <a href="#eda">Exploratory Analysis</a>
  <a href="#k">Choosing K</a>
  <a href="#models">Model Comparison</a>
  <a href="#profiles">Cluster Profiles</a>
  <a href="#about">About</a>
</nav>

<h2 id="eda">1. Exploratory Data Analysis</h2>
<p>
  Customer base of <strong>{{ row_count }}</strong> records from
  <code>{{ data_path }}</code>
  {% if generated %}(generated synthetically on this run){% else %}(loaded from disk){% endif %}.
</p>
<h3>Sample of the Customer Base</h3>
<table>
  <tr>{% for h in sample.headers %}<th>{{ h }}</th>{% endfor %}</tr>
  {% for row in sample.rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
</table>
<h3>Numeric Summary</h3>
<table>
  <tr>{% for h in summary.headers %}<th>{{ h }}</th>{% endfor %}</tr>
  {% for row in summary.rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
</table>
<div class="row">
  <img src="{{ charts.correlation }}" alt="Correlation matrix">
</div>
<img src="{{ charts.distributions }}" alt="Feature distributions">

<h2 id="k">2. Choosing the Number of Clusters</h2>
{% if charts.elbow %}
<div class="row">
  <img src="{{ charts.elbow }}" alt="Elbow method">
  <img src="{{ charts.silhouette }}" alt="Silhouette analysis">
</div>
<p class="note">
  The elbow of the inertia curve and the silhouette peak guide the choice of K.
</p>
{% else %}
<p class="note">The K sweep was skipped on this run.</p>
{% endif %}
<p>Number of clusters used for K-Means and hierarchical clustering: <strong>K = {{ k }}</strong>.</p>

<h2 id="models">3. Model Comparison</h2>
<div class="row">
  {% for s in charts.scatters %}<img src="{{ s.image }}" alt="{{ s.model }} clusters">{% endfor %}
</div>
<table>
  <tr><th>Model</th><th>Silhouette</th><th>Davies-Bouldin</th><th>Clusters</th><th>Noise points</th></tr>
  {% for row in score_rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
</table>
{% if skipped %}
<p class="note">Skipped (fewer than two clusters found): {{ skipped | join(", ") }}.</p>
{% endif %}
<p class="note">
  Higher silhouette and lower Davies-Bouldin indicate better-separated clusters.
</p>
<img src="{{ charts.sizes }}" alt="Cluster sizes">

<h2 id="profiles">4. Cluster Profiles (K-Means)</h2>
<table>
  <tr>{% for h in profile.headers %}<th>{{ h }}</th>{% endfor %}</tr>
  {% for row in profile.rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
</table>
{% for card in cards %}
<div class="card">
  <h3>Cluster {{ card.cluster }} &mdash; {{ card.n_customers }} customers</h3>
  <div class="row">
    <img src="{{ card.radar }}" alt="Cluster {{ card.cluster }} profile radar">
    <ul>
      {% for note in card.notes %}<li>{{ note }}</li>{% endfor %}
    </ul>
  </div>
</div>
{% endfor %}

<h2 id="about">5. About This Analysis</h2>
<p>
  Synthetic delinquent-debtor customer base segmented with K-Means,
  agglomerative hierarchical clustering and DBSCAN over standardized,
  one-hot-encoded features, compared with internal metrics and projected to
  two dimensions with PCA.
</p>
<table>
  <tr><th>Parameter</th><th>Value</th></tr>
  <tr><td>K (K-Means / hierarchical)</td><td>{{ k }}</td></tr>
  <tr><td>DBSCAN eps</td><td>{{ eps }}</td></tr>
  <tr><td>DBSCAN min_samples</td><td>{{ min_samples }}</td></tr>
  <tr><td>Random seed</td><td>{{ seed }}</td></tr>
</table>
</body>
</html>
"##;
