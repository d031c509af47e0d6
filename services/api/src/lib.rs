pub mod adapters;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
