//! HTTP request handlers for the RESTCONF API
//!
//! Handlers only move bytes in and out; every translation step lives in
//! [`RestconfService`](crate::service::RestconfService).

pub mod data;
pub mod streams;
