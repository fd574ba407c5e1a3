pub mod aggregator;
pub mod coverage;
pub mod error;
pub mod fetcher;
pub mod finalizer;
pub mod parser;
pub mod record_loader;

#[cfg(test)]
pub(crate) mod test_support;
