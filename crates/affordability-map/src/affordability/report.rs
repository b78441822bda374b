use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use super::classifier::Classification;
use super::domain::{City, FilterConfiguration, FilterRule, PostalCode, ReferenceSize};
use super::purchasing_power::AffordabilityCeiling;
use super::session::{ClassificationSession, ClassificationSummary, SessionError};

/// Flat listing of every region's classification, sorted by postal code.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub city: City,
    pub generated_on: NaiveDate,
    pub ceiling: AffordabilityCeiling,
    pub reference_size: ReferenceSize,
    pub filters: FilterConfiguration,
    pub summary: ClassificationSummary,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub postal_code: PostalCode,
    pub place_name: Option<String>,
    pub price: Option<f64>,
    pub classification: Classification,
    pub filtered: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassificationReport {
    pub fn from_session(
        session: &ClassificationSession,
        generated_on: NaiveDate,
    ) -> Result<Self, SessionError> {
        let regions = session.regions()?;
        let rows = session
            .assessments()?
            .iter()
            .map(|(postal_code, assessment)| ReportRow {
                postal_code: postal_code.clone(),
                place_name: regions
                    .get(postal_code)
                    .and_then(|region| region.place_name.clone()),
                price: assessment.price,
                classification: assessment.classification,
                filtered: assessment.filtered,
            })
            .collect();

        Ok(Self {
            city: session.active_city(),
            generated_on,
            ceiling: session.ceiling(),
            reference_size: session.reference_size(),
            filters: session.filters().clone(),
            summary: session.summary()?,
            rows,
        })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "postal_code",
            "place_name",
            "price",
            "classification",
            "filtered",
        ])?;

        for row in &self.rows {
            let price = row.price.map(|price| format!("{price:.0}")).unwrap_or_default();
            csv_writer.write_record([
                row.postal_code.as_str(),
                row.place_name.as_deref().unwrap_or(""),
                price.as_str(),
                row.classification.label(),
                if row.filtered { "true" } else { "false" },
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![
            format!("Affordability report for {}", self.city.label()),
            format!(
                "Generated {} | ceiling {} | reference size {}",
                self.generated_on, self.ceiling, self.reference_size
            ),
        ];

        if self.filters.has_active_rules() {
            lines.push(String::new());
            lines.push("Proximity filters".to_string());
            lines.extend(
                self.filters
                    .active_rules()
                    .map(|(kind, rule)| format!("- {}: {}", kind.label(), describe_rule(rule))),
            );
        }

        lines.push(String::new());
        lines.push("Categories".to_string());
        lines.extend(
            self.summary
                .counts
                .iter()
                .map(|(classification, count)| format!("- {}: {}", classification.label(), count)),
        );
        lines.push(format!(
            "- filtered by proximity: {}",
            self.summary.filtered
        ));

        lines.push(String::new());
        lines.push("Regions".to_string());
        lines.extend(self.rows.iter().map(|row| {
            let price = match row.price {
                Some(price) => format!("{price:.0}"),
                None => "no price".to_string(),
            };
            let filtered_note = if row.filtered { " (filtered)" } else { "" };
            format!(
                "- {} {} | {} | {}{}",
                row.postal_code,
                row.place_name.as_deref().unwrap_or("-"),
                price,
                row.classification.label(),
                filtered_note
            )
        }));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn describe_rule(rule: &FilterRule) -> String {
    let mut limits = Vec::new();
    if let Some(km) = rule.max_distance_km {
        limits.push(format!("under {km} km"));
    }
    if let Some(minutes) = rule.max_minutes {
        limits.push(format!("under {minutes} min"));
    }
    if limits.is_empty() {
        format!("{} leg required", rule.mode)
    } else {
        format!("{} {}", rule.mode, limits.join(", "))
    }
}
