use crate::infra::{parse_date, parse_filter};
use affordability_map::affordability::{
    AmenityKind, City, ClassificationReport, ClassificationSession, FilterRule,
    FinancialProfileUpdate, ReferenceSize,
};
use affordability_map::config::AppConfig;
use affordability_map::dataset::{DatasetSource, FileDatasetSource};
use affordability_map::error::AppError;
use affordability_map::telemetry::{self, LogOutput};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    Text,
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Directory holding `<city>.geojson` and `travel_directory.json` (defaults to APP_DATA_DIR)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// City to classify (defaults to APP_DEFAULT_CITY)
    #[arg(long)]
    pub(crate) city: Option<City>,
    /// Equity available for the purchase
    #[arg(long, default_value_t = 0.0)]
    pub(crate) equity: f64,
    /// Gross annual income
    #[arg(long, default_value_t = 400_000.0)]
    pub(crate) income: f64,
    /// Outstanding debt
    #[arg(long, default_value_t = 0.0)]
    pub(crate) debt: f64,
    /// Additional loan on top of the income-based limit
    #[arg(long, default_value_t = 0.0)]
    pub(crate) extra_loan: f64,
    /// Reference apartment size in square meters (20-200, steps of 10)
    #[arg(long, default_value_t = 60)]
    pub(crate) size: u16,
    /// Proximity rule as kind:mode[:max_km[:max_minutes]], e.g. shopping_mall:walking:2
    #[arg(long = "filter", value_parser = parse_filter)]
    pub(crate) filters: Vec<(AmenityKind, FilterRule)>,
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub(crate) format: ReportFormat,
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogOutput::Stderr)?;

    let ClassifyArgs {
        data_dir,
        city,
        equity,
        income,
        debt,
        extra_loan,
        size,
        filters,
        format,
        today,
    } = args;

    let city = city.unwrap_or(config.datasets.default_city);
    let source = FileDatasetSource::new(data_dir.unwrap_or(config.datasets.data_dir));
    let mut session = ClassificationSession::new(city);

    session.set_financial_profile(FinancialProfileUpdate {
        equity: Some(equity),
        annual_income: Some(income),
        existing_debt: Some(debt),
        extra_loan: Some(extra_loan),
    });
    session.set_reference_size(ReferenceSize::new(size)?);
    for (kind, rule) in filters {
        session.set_filter_rule(kind, Some(rule));
    }

    info!(%city, data_dir = %source.root().display(), "loading datasets");
    let travel = Arc::new(source.travel_directory()?);
    session.apply_travel_directory(Ok(travel));
    let regions = Arc::new(source.regions(city)?);
    let ticket = session.region_load_ticket();
    session.apply_regions(ticket, Ok(regions));

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let report = ClassificationReport::from_session(&session, today)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        ReportFormat::Text => out.write_all(report.render_text().as_bytes())?,
        ReportFormat::Json => report.write_json(&mut out)?,
        ReportFormat::Csv => report.write_csv(&mut out)?,
    }
    out.flush()?;
    Ok(())
}

pub(crate) fn run_cities() -> Result<(), AppError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Supported cities")?;
    for city in City::ordered() {
        let centre = city.centre();
        writeln!(
            out,
            "- {:<13} {:<13} centre {:.4}, {:.4}",
            city.slug(),
            city.label(),
            centre.lat,
            centre.lng
        )?;
    }
    Ok(())
}
