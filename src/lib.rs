mod config;
mod error;
mod ghcn;
mod records;
mod stations;
mod types;
mod utils;

pub use config::*;
pub use error::GhcnError;
pub use ghcn::*;

pub use types::aggregate::*;
pub use types::element::Element;
pub use types::query::*;
pub use types::season::Season;
pub use types::station::*;

pub use stations::directory::{load_stations, parse_station_line, StationDirectory};
pub use stations::distance::{distance_km, EARTH_RADIUS_KM};
pub use stations::error::DirectoryError;
pub use stations::locate_station::search_stations;

pub use records::aggregator::{
    accumulate, aggregate_station, Accumulators, ElementSums, RangePolicy, SeasonalAggregator,
    TemperatureSums, YearAccumulator,
};
pub use records::coverage::has_complete_coverage;
pub use records::error::RecordError;
pub use records::finalizer::finalize;
pub use records::parser::{parse_line, DailyRecordLine, MISSING_VALUE};
