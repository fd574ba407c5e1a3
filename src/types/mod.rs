pub mod aggregate;
pub mod element;
pub mod query;
pub mod season;
pub mod station;
