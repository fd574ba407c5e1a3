//! Parsing of the fixed-column `ghcnd-stations.txt` listing into an immutable,
//! spatially indexed [`StationDirectory`].

use crate::types::station::{Station, StationPoint};
use log::trace;
use rstar::RTree;
use std::collections::HashMap;
use std::io::{self, BufRead};

const ID_COLUMNS: (usize, usize) = (0, 11);
const LAT_COLUMNS: (usize, usize) = (12, 20);
const LON_COLUMNS: (usize, usize) = (21, 30);
const NAME_COLUMNS: (usize, usize) = (41, 71);

/// An immutable snapshot of the station list.
///
/// Stations keep the order of the source lines. Lookups by id return the first
/// station listed under that id. Searching is implemented in
/// [`crate::StationDirectory::search`].
#[derive(Debug, Clone)]
pub struct StationDirectory {
    stations: Vec<Station>,
    by_id: HashMap<String, usize>,
    rtree: RTree<StationPoint>,
}

impl StationDirectory {
    pub fn from_stations(stations: Vec<Station>) -> Self {
        let mut by_id = HashMap::with_capacity(stations.len());
        for (index, station) in stations.iter().enumerate() {
            by_id.entry(station.id.clone()).or_insert(index);
        }
        let points = stations
            .iter()
            .enumerate()
            .map(|(index, station)| StationPoint::new(index, station.lat, station.lon))
            .collect();
        Self {
            stations,
            by_id,
            rtree: RTree::bulk_load(points),
        }
    }

    /// Parses the full text of a station listing. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        Self::from_stations(load_stations(text.lines()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut stations = Vec::new();
        for line in reader.lines() {
            if let Some(station) = parse_station_line(&line?) {
                stations.push(station);
            }
        }
        Ok(Self::from_stations(stations))
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.by_id.get(id).map(|&index| &self.stations[index])
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub(crate) fn rtree(&self) -> &RTree<StationPoint> {
        &self.rtree
    }
}

/// Parses station listing lines, keeping their order and skipping every line whose
/// latitude or longitude is not a finite number.
pub fn load_stations<I, S>(lines: I) -> Vec<Station>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_station_line(line.as_ref()))
        .collect()
}

pub fn parse_station_line(line: &str) -> Option<Station> {
    let lat = parse_coordinate(column(line, LAT_COLUMNS));
    let lon = parse_coordinate(column(line, LON_COLUMNS));
    let (Some(lat), Some(lon)) = (lat, lon) else {
        trace!("Skipping malformed station line: {line:?}");
        return None;
    };
    Some(Station {
        id: column(line, ID_COLUMNS).trim().to_string(),
        lat,
        lon,
        name: column(line, NAME_COLUMNS).trim().to_string(),
    })
}

/// The bytes of `line` in `[start, end)`, clamped to the line length. A bound that
/// lands inside a multibyte character moves back to the start of that character.
fn column(line: &str, (start, end): (usize, usize)) -> &str {
    let start = char_boundary_before(line, start);
    let end = char_boundary_before(line, end).max(start);
    &line[start..end]
}

fn char_boundary_before(line: &str, index: usize) -> usize {
    let mut index = index.min(line.len());
    while !line.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn parse_coordinate(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Renders a station the way `ghcnd-stations.txt` lays out its columns.
    pub(crate) fn station_line(station: &Station) -> String {
        format!(
            "{:<11} {:>8.4} {:>9.4} {:>6.1} {:<2} {:<30} {:<3} {:<3} {:<5}",
            station.id, station.lat, station.lon, 314.0, "", station.name, "GSN", "", "10739"
        )
    }

    pub(crate) fn station(id: &str, lat: f64, lon: f64, name: &str) -> Station {
        Station {
            id: id.to_string(),
            lat,
            lon,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_real_line() {
        let line = "GME00115771  48.8281    9.2000  314.0    STUTTGART-SCHNARRENBERG        GSN     10739";
        let station = parse_station_line(line).unwrap();
        assert_eq!(station.id, "GME00115771");
        assert_eq!(station.lat, 48.8281);
        assert_eq!(station.lon, 9.2);
        assert_eq!(station.name, "STUTTGART-SCHNARRENBERG");
    }

    #[test]
    fn test_round_trip() {
        let stations = [
            station("GME00126922", 49.1236, 9.3547, "OBERSULM-WILLSBACH"),
            station("USW00094728", 40.7789, -73.9692, "NEW YORK CNTRL PK TWR"),
            station("ASN00066062", -33.8607, 151.205, "SYDNEY (OBSERVATORY HILL)"),
            station("AYM00089009", -90.0, 0.0, "AMUNDSEN-SCOTT"),
        ];
        for original in stations {
            let line = station_line(&original);
            assert_eq!(parse_station_line(&line), Some(original));
        }
    }

    #[test]
    fn test_short_line_name() {
        let line = "ACW00011604  17.1167  -61.7833   10.1    ST JOHNS";
        assert_eq!(parse_station_line(line).unwrap().name, "ST JOHNS");

        let line = "ACW00011604  17.1167  -61.7833";
        let station = parse_station_line(line).unwrap();
        assert_eq!(station.name, "");
        assert_eq!(station.lon, -61.7833);
    }

    #[test]
    fn test_multibyte_name_is_kept() {
        let line = station_line(&station("GME00111445", 48.1, 11.5, "MÜNCHEN-STADT"));
        assert_eq!(parse_station_line(&line).unwrap().name, "MÜNCHEN-STADT");

        // The last name column falls inside the two bytes of 'Ü'.
        let name = format!("{}Ü", "A".repeat(29));
        let line = station_line(&station("GME00111445", 48.1, 11.5, &name));
        assert_eq!(parse_station_line(&line).unwrap().name, "A".repeat(29));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = [
            "GME00115771  48.8281    9.2000  314.0    STUTTGART-SCHNARRENBERG",
            "BROKEN00001  ab.cdef    9.2000  314.0    BROKEN",
            "",
            "TOO SHORT",
            "GME00126922  49.1236    9.3547  166.0    OBERSULM-WILLSBACH",
        ]
        .join("\n");
        let directory = StationDirectory::parse(&text);
        let ids: Vec<&str> = directory.stations().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["GME00115771", "GME00126922"]);
    }

    #[test]
    fn test_empty_source() {
        assert!(StationDirectory::parse("").is_empty());
        assert!(load_stations(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_from_reader_and_lookup() {
        let first = station("GME00115771", 48.8281, 9.2, "STUTTGART-SCHNARRENBERG");
        let duplicate = station("GME00115771", 10.0, 10.0, "DUPLICATE");
        let other = station("GME00126922", 49.1236, 9.3547, "OBERSULM-WILLSBACH");
        let text = [&first, &duplicate, &other]
            .iter()
            .map(|s| station_line(s))
            .collect::<Vec<_>>()
            .join("\r\n");

        let directory = StationDirectory::from_reader(io::Cursor::new(text)).unwrap();
        assert_eq!(directory.len(), 3);
        assert_eq!(directory.get("GME00115771"), Some(&first));
        assert_eq!(directory.get("GME00126922"), Some(&other));
        assert_eq!(directory.get("USW00094728"), None);
        assert_eq!(directory.rtree().size(), 3);
    }
}
