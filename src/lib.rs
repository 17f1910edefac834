//! Patient-satisfaction metrics over survey rows pulled from a spreadsheet,
//! file, HTTP endpoint or Postgres table.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod filter;
pub mod locale;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod report;
pub mod source;

pub use error::{Error, Result};
