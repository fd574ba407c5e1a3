use serde::{Deserialize, Serialize};
use std::fmt;

/// The daily temperature elements that are aggregated. Every other GHCN element
/// (PRCP, SNOW, TAVG, ...) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    #[serde(rename = "TMAX")]
    Tmax,
    #[serde(rename = "TMIN")]
    Tmin,
}

impl Element {
    pub const ALL: [Element; 2] = [Element::Tmax, Element::Tmin];

    pub fn code(self) -> &'static str {
        match self {
            Element::Tmax => "TMAX",
            Element::Tmin => "TMIN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TMAX" => Some(Element::Tmax),
            "TMIN" => Some(Element::Tmin),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
