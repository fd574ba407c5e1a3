//! Validated request types: coordinates, year windows and radius searches.

use crate::error::GhcnError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RADIUS_KM: f64 = 50.0;
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_START_YEAR: i32 = 2010;
pub const DEFAULT_END_YEAR: i32 = 2020;

/// Represents a geographical coordinate using Latitude and Longitude.
///
/// Used as input for location-based queries like [`crate::Ghcn::find_stations`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }

    /// Checks that both components are finite and inside their degree ranges.
    pub fn validate(&self) -> Result<(), GhcnError> {
        validate_coordinate("lat", self.0, 90.0)?;
        validate_coordinate("lon", self.1, 180.0)
    }
}

fn validate_coordinate(parameter: &'static str, value: f64, limit: f64) -> Result<(), GhcnError> {
    if !value.is_finite() {
        return Err(GhcnError::invalid_parameter(
            parameter,
            value.to_string(),
            "must be a finite number",
        ));
    }
    if !(-limit..=limit).contains(&value) {
        return Err(GhcnError::invalid_parameter(
            parameter,
            value.to_string(),
            format!("must be between -{limit} and {limit}"),
        ));
    }
    Ok(())
}

/// An inclusive window of calendar years, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self, GhcnError> {
        if start > end {
            return Err(GhcnError::invalid_parameter(
                "start_year",
                start.to_string(),
                format!("must not be after end_year {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn single(year: i32) -> Self {
        Self {
            start: year,
            end: year,
        }
    }

    /// Parses the raw `start_year`/`end_year` request parameters, falling back to
    /// 2010 and 2020 when a parameter is absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, GhcnError> {
        let start = parse_or("start_year", start, DEFAULT_START_YEAR)?;
        let end = parse_or("end_year", end, DEFAULT_END_YEAR)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_YEAR,
            end: DEFAULT_END_YEAR,
        }
    }
}

/// A validated radius search around a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub location: LatLon,
    pub radius_km: f64,
    pub max_results: usize,
}

impl SearchQuery {
    pub fn new(location: LatLon, radius_km: f64, max_results: usize) -> Result<Self, GhcnError> {
        location.validate()?;
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(GhcnError::invalid_parameter(
                "radius",
                radius_km.to_string(),
                "must be a non-negative number",
            ));
        }
        Ok(Self {
            location,
            radius_km,
            max_results,
        })
    }

    /// Builds a query from raw request strings. `radius` defaults to 50 km and `max`
    /// to 10 results.
    ///
    /// ```
    /// use ghcn_climate::{GhcnError, SearchQuery};
    ///
    /// let query = SearchQuery::parse("48.78", "9.18", None, Some("5")).unwrap();
    /// assert_eq!(query.radius_km, 50.0);
    /// assert_eq!(query.max_results, 5);
    ///
    /// let err = SearchQuery::parse("x", "1", Some("1"), Some("1")).unwrap_err();
    /// assert!(matches!(err, GhcnError::InvalidParameter { parameter: "lat", .. }));
    /// ```
    pub fn parse(
        lat: &str,
        lon: &str,
        radius: Option<&str>,
        max: Option<&str>,
    ) -> Result<Self, GhcnError> {
        let lat = parse_value::<f64>("lat", lat)?;
        let lon = parse_value::<f64>("lon", lon)?;
        let radius_km = parse_or("radius", radius, DEFAULT_RADIUS_KM)?;
        let max_results = parse_or("max", max, DEFAULT_MAX_RESULTS)?;
        Self::new(LatLon(lat, lon), radius_km, max_results)
    }
}

fn parse_value<T: std::str::FromStr>(parameter: &'static str, raw: &str) -> Result<T, GhcnError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| GhcnError::invalid_parameter(parameter, raw, e.to_string()))
}

fn parse_or<T: std::str::FromStr>(
    parameter: &'static str,
    raw: Option<&str>,
    default: T,
) -> Result<T, GhcnError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(parameter, raw),
        None => Ok(default),
    }
}
