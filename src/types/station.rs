//! Data structures for GHCN-Daily stations and search hits, plus the point type
//! stored in the directory's `rstar` spatial index.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A single GHCN-Daily station as listed in `ghcnd-stations.txt`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The 11 character GHCN station identifier (e.g. "GME00115771").
    pub id: String,
    /// Latitude in decimal degrees (positive for North).
    pub lat: f64,
    /// Longitude in decimal degrees (positive for East).
    pub lon: f64,
    /// Station name, trimmed.
    pub name: String,
}

/// A station returned by a radius search together with its distance to the query point.
///
/// Serializes flat, as `{id, lat, lon, name, distance}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResult {
    #[serde(flatten)]
    pub station: Station,
    /// Great-circle distance in kilometres, rounded to 2 decimals.
    pub distance: f64,
}

/// Entry of the directory's R-tree.
///
/// Positions are unit vectors on the sphere, so the euclidean chord length between two
/// entries grows monotonically with their great-circle distance. A chord query therefore
/// selects exactly the stations inside a spherical cap, independent of the antimeridian
/// or the poles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StationPoint {
    /// Position of the station in directory order.
    pub index: usize,
    pub position: [f64; 3],
}

impl StationPoint {
    pub fn new(index: usize, lat: f64, lon: f64) -> Self {
        Self {
            index,
            position: unit_vector(lat, lon),
        }
    }
}

pub(crate) fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

impl RTreeObject for StationPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for StationPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.position
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}
