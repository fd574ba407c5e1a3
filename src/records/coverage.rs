use crate::records::parser::parse_line;
use crate::types::element::Element;
use crate::types::query::YearRange;

/// Whether `text` holds at least one valid TMAX and one valid TMIN observation for
/// `station_id` in both the first and the last year of `range`.
pub fn has_complete_coverage(text: &str, station_id: &str, range: YearRange) -> bool {
    // [start TMAX, start TMIN, end TMAX, end TMIN]
    let mut seen = [false; 4];
    for record in text.lines().filter_map(parse_line) {
        if record.station_id != station_id || record.present_values().next().is_none() {
            continue;
        }
        let offset = match record.element {
            Element::Tmax => 0,
            Element::Tmin => 1,
        };
        if record.year == range.start() {
            seen[offset] = true;
        }
        if record.year == range.end() {
            seen[2 + offset] = true;
        }
        if seen.iter().all(|&s| s) {
            return true;
        }
    }
    false
}
