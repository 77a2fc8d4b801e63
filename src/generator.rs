//! Synthetic delinquent-customer data generation and CSV persistence

use polars::prelude::*;
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Beta;
use std::path::Path;

/// Columns every customer frame must carry, in generation order
pub const EXPECTED_COLUMNS: [&str; 13] = [
    "customer_id",
    "age",
    "sex",
    "marital_status",
    "education_level",
    "dependents",
    "employment_type",
    "monthly_income",
    "credit_score",
    "payment_history",
    "debt_product",
    "months_in_debt",
    "debt_amount",
];

const SEXES: [&str; 2] = ["Male", "Female"];
const MARITAL_STATUSES: [&str; 4] = ["Single", "Married", "Divorced", "Widowed"];
const EDUCATION_LEVELS: [&str; 4] = ["Primary", "Secondary", "Bachelor", "Postgraduate"];
const EMPLOYMENT_TYPES: [&str; 5] = [
    "Salaried",
    "SelfEmployed",
    "PublicSector",
    "BusinessOwner",
    "Unemployed",
];
const DEBT_PRODUCTS: [&str; 4] = ["CreditCard", "PersonalLoan", "VehicleLoan", "Overdraft"];
const DEBT_PRODUCT_WEIGHTS: [f64; 4] = [0.40, 0.30, 0.15, 0.15];

/// Monthly income base by education level
fn income_base(education: &str) -> f64 {
    match education {
        "Primary" => 1800.0,
        "Secondary" => 3500.0,
        "Bachelor" => 7000.0,
        _ => 12000.0,
    }
}

/// Income multiplier by employment type
fn income_modifier(employment: &str) -> f64 {
    match employment {
        "Salaried" => 1.0,
        "SelfEmployed" => 1.2,
        "PublicSector" => 1.3,
        "BusinessOwner" => 1.8,
        _ => 0.3,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generate a synthetic base of delinquent customers.
///
/// Income is correlated with education and employment, credit score with
/// income, age and payment history, and debt amount with income, so the
/// segmentation has realistic structure to find. Deterministic for a fixed
/// seed.
pub fn generate_customers(n_customers: usize, seed: u64) -> crate::Result<DataFrame> {
    if n_customers == 0 {
        anyhow::bail!("Cannot generate an empty customer base");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let payment_dist = Beta::new(5.0, 2.0)?;
    let income_noise = Uniform::new(0.7, 1.3);
    let debt_ratio = Uniform::new(0.2, 2.0);
    let product_dist = WeightedIndex::new(DEBT_PRODUCT_WEIGHTS)?;

    let mut customer_ids = Vec::with_capacity(n_customers);
    let mut ages = Vec::with_capacity(n_customers);
    let mut sexes = Vec::with_capacity(n_customers);
    let mut marital_statuses = Vec::with_capacity(n_customers);
    let mut education_levels = Vec::with_capacity(n_customers);
    let mut dependents = Vec::with_capacity(n_customers);
    let mut employment_types = Vec::with_capacity(n_customers);
    let mut incomes = Vec::with_capacity(n_customers);
    let mut credit_scores = Vec::with_capacity(n_customers);
    let mut payment_histories = Vec::with_capacity(n_customers);
    let mut debt_products = Vec::with_capacity(n_customers);
    let mut months_in_debt = Vec::with_capacity(n_customers);
    let mut debt_amounts = Vec::with_capacity(n_customers);

    for id in 1..=n_customers {
        let age = rng.gen_range(18..=80i64);
        let sex = SEXES[rng.gen_range(0..SEXES.len())];
        let marital = MARITAL_STATUSES[rng.gen_range(0..MARITAL_STATUSES.len())];
        let education = EDUCATION_LEVELS[rng.gen_range(0..EDUCATION_LEVELS.len())];
        let employment = EMPLOYMENT_TYPES[rng.gen_range(0..EMPLOYMENT_TYPES.len())];

        let income = round2(income_base(education) * income_modifier(employment) * income_noise.sample(&mut rng));
        let payment_history = round2(payment_dist.sample(&mut rng));

        // Score mixes income, age and payment behavior, with an unemployment
        // penalty, clipped to the usual bureau range.
        let mut score = 300.0
            + income / 200.0
            + age as f64 * 1.5
            + payment_history * 300.0
            + rng.gen_range(-50..50i64) as f64;
        if employment == "Unemployed" {
            score -= 100.0;
        }
        let score = score.clamp(300.0, 950.0) as i64;

        let debt_amount = round2((income * debt_ratio.sample(&mut rng)).max(100.0));

        customer_ids.push(id as i64);
        ages.push(age);
        sexes.push(sex);
        marital_statuses.push(marital);
        education_levels.push(education);
        dependents.push(rng.gen_range(0..=5i64));
        employment_types.push(employment);
        incomes.push(income);
        credit_scores.push(score);
        payment_histories.push(payment_history);
        debt_products.push(DEBT_PRODUCTS[product_dist.sample(&mut rng)]);
        months_in_debt.push(rng.gen_range(1..=60i64));
        debt_amounts.push(debt_amount);
    }

    let df = df!(
        "customer_id" => customer_ids,
        "age" => ages,
        "sex" => sexes,
        "marital_status" => marital_statuses,
        "education_level" => education_levels,
        "dependents" => dependents,
        "employment_type" => employment_types,
        "monthly_income" => incomes,
        "credit_score" => credit_scores,
        "payment_history" => payment_histories,
        "debt_product" => debt_products,
        "months_in_debt" => months_in_debt,
        "debt_amount" => debt_amounts,
    )?;

    Ok(df)
}

/// Write the customer frame as CSV
pub fn save_csv(df: &mut DataFrame, path: &str) -> crate::Result<()> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

/// Load a customer CSV and verify it carries the expected schema
pub fn load_csv(path: &str) -> crate::Result<DataFrame> {
    let df = CsvReader::from_path(path)?.has_header(true).finish()?;
    for column in EXPECTED_COLUMNS {
        if df.column(column).is_err() {
            anyhow::bail!("Customer file '{}' is missing the '{}' column", path, column);
        }
    }
    if df.height() == 0 {
        anyhow::bail!("Customer file '{}' contains no rows", path);
    }
    Ok(df)
}

/// Load the customer base from `path`, or generate and persist it when the
/// file does not exist yet. Returns the frame and whether it was generated.
pub fn load_or_generate(path: &str, n_customers: usize, seed: u64) -> crate::Result<(DataFrame, bool)> {
    if Path::new(path).exists() {
        Ok((load_csv(path)?, false))
    } else {
        let mut df = generate_customers(n_customers, seed)?;
        save_csv(&mut df, path)?;
        Ok((df, true))
    }
}
