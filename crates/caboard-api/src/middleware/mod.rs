//! # Middleware
//!
//! Request metrics. Tracing is `tower_http::trace::TraceLayer`, applied in
//! [`crate::app`]; authentication lives in [`crate::auth`].

pub mod metrics;
