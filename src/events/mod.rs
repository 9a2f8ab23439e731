//! Event-driven sampling of price series.

mod cusum;

pub use cusum::{CusumConfig, CusumFilter, EventError};
