use serde::{Deserialize, Serialize};

use super::purchasing_power::AffordabilityCeiling;

/// Ceiling must exceed the price by this factor for a region to count as strongly
/// affordable.
pub const STRONG_HEADROOM_FACTOR: f64 = 1.2;

/// Display category assigned to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    StronglyAffordable,
    MarginallyAffordable,
    Unaffordable,
}

impl Classification {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::StronglyAffordable,
            Self::MarginallyAffordable,
            Self::Unaffordable,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::StronglyAffordable => "strongly_affordable",
            Self::MarginallyAffordable => "marginally_affordable",
            Self::Unaffordable => "unaffordable",
        }
    }
}

/// Assign a category. First matching rule wins:
///
/// 1. filtered regions are unaffordable regardless of price;
/// 2. a missing, zero, negative or non-finite price is unaffordable;
/// 3. a ceiling at or below the price is unaffordable;
/// 4. a ceiling above `price × 1.2` is strongly affordable;
/// 5. anything else is marginally affordable.
pub fn classify(
    ceiling: AffordabilityCeiling,
    region_price: Option<f64>,
    filtered: bool,
) -> Classification {
    if filtered {
        return Classification::Unaffordable;
    }

    let Some(price) = region_price.filter(|price| price.is_finite() && *price > 0.0) else {
        return Classification::Unaffordable;
    };

    let ceiling = ceiling.value();
    if ceiling <= price {
        Classification::Unaffordable
    } else if ceiling > price * STRONG_HEADROOM_FACTOR {
        Classification::StronglyAffordable
    } else {
        Classification::MarginallyAffordable
    }
}
