//! # Tower Middleware
//!
//! HTTP-level concerns layered around the route handlers. Auth lives in
//! `crate::auth`; this module holds the Prometheus metrics middleware.

pub mod metrics;
