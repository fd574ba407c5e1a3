use crate::error::GhcnError;
use crate::stations::directory::StationDirectory;
use crate::stations::distance::{distance_km, EARTH_RADIUS_KM};
use crate::types::query::{LatLon, SearchQuery};
use crate::types::station::{unit_vector, SearchResult, Station};
use crate::utils::round_to;
use ordered_float::OrderedFloat;
use std::f64::consts::PI;

// Widens the R-tree cap so that rounding in the chord test never drops a station
// the exact haversine filter would keep.
const ANGLE_MARGIN_RAD: f64 = 1e-6;

struct Ranked {
    index: usize,
    distance_km: f64,
}

impl StationDirectory {
    /// All stations within `radius_km` of `center`, nearest first.
    ///
    /// Distances are compared unrounded against the radius. Results are ordered by the
    /// distance rounded to 2 decimals, with equal distances kept in directory order.
    pub fn within_radius(&self, center: LatLon, radius_km: f64) -> Vec<SearchResult> {
        let mut ranked: Vec<Ranked> = self
            .candidate_indices(center, radius_km)
            .into_iter()
            .filter_map(|index| {
                let station = &self.stations()[index];
                let distance = distance_km(center.0, center.1, station.lat, station.lon);
                (distance <= radius_km).then(|| Ranked {
                    index,
                    distance_km: round_to(distance, 2),
                })
            })
            .collect();

        ranked.sort_by_key(|r| (OrderedFloat(r.distance_km), r.index));

        ranked
            .into_iter()
            .map(|r| SearchResult {
                station: self.stations()[r.index].clone(),
                distance: r.distance_km,
            })
            .collect()
    }

    /// Runs a radius search, truncated to `query.max_results`.
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        self.search_filtered(query, |_| true)
    }

    /// Like [`StationDirectory::search`], but only stations accepted by `predicate`
    /// count toward `max_results`.
    pub fn search_filtered<F>(&self, query: &SearchQuery, mut predicate: F) -> Vec<SearchResult>
    where
        F: FnMut(&Station) -> bool,
    {
        if query.max_results == 0 {
            return vec![];
        }
        self.within_radius(query.location, query.radius_km)
            .into_iter()
            .filter(|result| predicate(&result.station))
            .take(query.max_results)
            .collect()
    }

    /// Indices of the stations inside a spherical cap slightly larger than the search
    /// circle, in directory order.
    fn candidate_indices(&self, center: LatLon, radius_km: f64) -> Vec<usize> {
        let angle = radius_km / EARTH_RADIUS_KM + ANGLE_MARGIN_RAD;
        let mut indices: Vec<usize> = if angle >= PI {
            (0..self.len()).collect()
        } else {
            let chord = 2.0 * (angle / 2.0).sin();
            self.rtree()
                .locate_within_distance(unit_vector(center.0, center.1), chord * chord)
                .map(|point| point.index)
                .collect()
        };
        indices.sort_unstable();
        indices
    }
}

/// Radius search from raw request parameters; see [`SearchQuery::parse`] for the
/// defaults and validation rules.
pub fn search_stations(
    directory: &StationDirectory,
    lat: &str,
    lon: &str,
    radius: Option<&str>,
    max: Option<&str>,
) -> Result<Vec<SearchResult>, GhcnError> {
    let query = SearchQuery::parse(lat, lon, radius, max)?;
    Ok(directory.search(&query))
}
