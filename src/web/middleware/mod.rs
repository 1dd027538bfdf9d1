//! # Web API Middleware
//!
//! Request ids and request-log publishing. Authentication happens in the
//! extractors so public and protected handlers share one router.

pub mod request_id;
pub mod request_log;
