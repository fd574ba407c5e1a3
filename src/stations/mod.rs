pub mod directory;
pub mod directory_store;
pub mod distance;
pub mod error;
pub mod locate_station;
