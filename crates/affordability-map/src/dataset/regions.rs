use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::DatasetError;
use crate::affordability::{City, PostalCode, Region, RegionDataset, RegionStatistics};

/// Parse a GeoJSON `FeatureCollection` of postal-code polygons.
pub fn parse_regions<R: Read>(city: City, reader: R) -> Result<RegionDataset, DatasetError> {
    let collection: FeatureCollection = serde_json::from_reader(reader)?;
    let regions = collection
        .features
        .into_iter()
        .map(|feature| feature.into_region())
        .collect();
    Ok(RegionDataset::new(city, regions)?)
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: serde_json::Value,
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureProperties {
    #[serde(alias = "postalCode")]
    postnummer: String,
    #[serde(default)]
    poststed: Option<String>,
    #[serde(default)]
    average_price_per_size: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    average_square_meter_price: Option<f64>,
    #[serde(default)]
    average_price: Option<f64>,
    #[serde(default)]
    price_percentage_change_last_year: Option<f64>,
    #[serde(default)]
    price_percentage_change_last_quarter: Option<f64>,
    #[serde(default)]
    average_sales_time_in_days: Option<f64>,
    #[serde(default)]
    number_of_estates_sold_last_quarter: Option<u32>,
    #[serde(default)]
    number_of_estates_sold_last_month: Option<u32>,
    #[serde(default)]
    last_updated: Option<String>,
}

impl Feature {
    fn into_region(self) -> Region {
        let properties = self.properties;
        let postal_code = PostalCode::new(properties.postnummer.trim());

        let mut average_price_per_size = BTreeMap::new();
        for (size, price) in properties.average_price_per_size {
            match (size.trim().parse::<u16>(), price) {
                (Ok(size), Some(price)) => {
                    average_price_per_size.insert(size, price);
                }
                (Ok(_), None) => {}
                (Err(_), _) => {
                    debug!(%postal_code, key = %size, "ignoring non-numeric price size key");
                }
            }
        }

        let statistics = RegionStatistics {
            average_price: properties.average_price,
            price_change_last_year: properties.price_percentage_change_last_year,
            price_change_last_quarter: properties.price_percentage_change_last_quarter,
            average_sales_time_days: properties.average_sales_time_in_days,
            estates_sold_last_quarter: properties.number_of_estates_sold_last_quarter,
            estates_sold_last_month: properties.number_of_estates_sold_last_month,
            last_updated: properties.last_updated.as_deref().and_then(parse_date),
        };

        Region {
            postal_code,
            place_name: properties
                .poststed
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            average_price_per_size,
            average_square_meter_price: properties.average_square_meter_price,
            statistics,
            geometry: self.geometry,
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordability::ReferenceSize;
    use std::io::Cursor;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [[[10.7, 59.9], [10.8, 59.9], [10.8, 60.0]]] },
                "properties": {
                    "objtype": "Postnummeromrade",
                    "postnummer": "0150",
                    "poststed": "OSLO",
                    "averagePricePerSize": { "60": 4200000, "70": null, "big": 1 },
                    "averageSquareMeterPrice": 95000,
                    "pricePercentageChangeLastYear": 3.4,
                    "averageSalesTimeInDays": 21,
                    "lastUpdated": "2024-05-02"
                }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "postnummer": " 0151 " }
            }
        ]
    }"#;

    #[test]
    fn parses_prices_statistics_and_geometry() {
        let dataset = parse_regions(City::Oslo, Cursor::new(SAMPLE)).expect("parses");
        assert_eq!(dataset.len(), 2);

        let region = dataset.get(&PostalCode::from("0150")).expect("region present");
        assert_eq!(region.place_name.as_deref(), Some("OSLO"));
        assert_eq!(region.price_for(ReferenceSize::default()), Some(4_200_000.0));
        assert_eq!(region.average_price_per_size.len(), 1);
        assert_eq!(region.average_square_meter_price, Some(95_000.0));
        assert_eq!(region.statistics.price_change_last_year, Some(3.4));
        assert_eq!(
            region.statistics.last_updated,
            NaiveDate::from_ymd_opt(2024, 5, 2)
        );
        assert!(region.geometry.is_object());
    }

    #[test]
    fn trims_postal_codes_and_tolerates_missing_statistics() {
        let dataset = parse_regions(City::Oslo, Cursor::new(SAMPLE)).expect("parses");
        let region = dataset.get(&PostalCode::from("0151")).expect("trimmed code");
        assert!(region.average_price_per_size.is_empty());
        assert!(region.place_name.is_none());
        assert_eq!(region.statistics, RegionStatistics::default());
    }

    #[test]
    fn duplicate_postal_codes_make_the_dataset_unavailable() {
        let json = r#"{ "features": [
            { "properties": { "postnummer": "7010" } },
            { "properties": { "postnummer": "7010" } }
        ] }"#;
        match parse_regions(City::Trondheim, Cursor::new(json)) {
            Err(DatasetError::DuplicatePostalCode(err)) => {
                assert_eq!(err.city, City::Trondheim);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }
}
