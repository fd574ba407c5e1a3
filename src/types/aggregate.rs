//! Output types of the seasonal aggregation.

use crate::types::season::Season;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Averages of daily maximum and minimum temperature in °C, rounded to one decimal.
///
/// An average is `None` when no valid observation of that element was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAverages {
    #[serde(rename = "avg_TMAX")]
    pub avg_tmax: Option<f64>,
    #[serde(rename = "avg_TMIN")]
    pub avg_tmin: Option<f64>,
}

impl TemperatureAverages {
    pub fn is_empty(&self) -> bool {
        self.avg_tmax.is_none() && self.avg_tmin.is_none()
    }
}

/// Averages for one calendar year plus the seasons filed under that year.
///
/// Only non-empty seasons are present in `seasons`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    #[serde(rename = "avg_TMAX")]
    pub avg_tmax: Option<f64>,
    #[serde(rename = "avg_TMIN")]
    pub avg_tmin: Option<f64>,
    pub seasons: BTreeMap<Season, TemperatureAverages>,
}

impl YearSummary {
    pub fn averages(&self) -> TemperatureAverages {
        TemperatureAverages {
            avg_tmax: self.avg_tmax,
            avg_tmin: self.avg_tmin,
        }
    }

    pub fn season(&self, season: Season) -> Option<&TemperatureAverages> {
        self.seasons.get(&season)
    }
}

/// The per-station aggregation result.
///
/// Serializes as `{"station": .., "name": .., "years": {"2024": {..}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(rename = "station")]
    pub station_id: String,
    #[serde(rename = "name")]
    pub station_name: String,
    pub years: BTreeMap<i32, YearSummary>,
}

impl AggregateResult {
    pub fn year(&self, year: i32) -> Option<&YearSummary> {
        self.years.get(&year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut seasons = BTreeMap::new();
        seasons.insert(
            Season::Winter,
            TemperatureAverages {
                avg_tmax: Some(8.8),
                avg_tmin: None,
            },
        );
        let mut years = BTreeMap::new();
        years.insert(
            2024,
            YearSummary {
                avg_tmax: Some(17.2),
                avg_tmin: Some(7.5),
                seasons,
            },
        );
        let result = AggregateResult {
            station_id: "GME00115771".to_string(),
            station_name: "STUTTGART-SCHNARRENBERG".to_string(),
            years,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["station"], "GME00115771");
        assert_eq!(json["name"], "STUTTGART-SCHNARRENBERG");
        assert_eq!(json["years"]["2024"]["avg_TMAX"], 17.2);
        assert_eq!(json["years"]["2024"]["seasons"]["Winter"]["avg_TMAX"], 8.8);
        assert!(json["years"]["2024"]["seasons"]["Winter"]["avg_TMIN"].is_null());

        let back: AggregateResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
