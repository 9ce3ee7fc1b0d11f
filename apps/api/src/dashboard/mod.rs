//! Business dashboard. The SQL layer only loads rows; every figure is
//! derived by `metrics::summarize`.

pub mod handlers;
pub mod metrics;
