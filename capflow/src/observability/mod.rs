//! Observability utilities.

mod tracing;

pub use tracing::{
    env_filter, init_tracing, LogFormat, SpanTimer, DEFAULT_LOG_FILTER, LOG_ENV,
};
