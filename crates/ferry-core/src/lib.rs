//! Core error model for bridging RPC handlers onto HTTP
//!
//! Holds the structured status value, the failure taxonomy handlers raise,
//! the mapping between the two, and the JSON rendering used on the wire.
//! Nothing in this crate performs I/O.

#![allow(clippy::must_use_candidate)]

mod failure;
mod json;
mod mapper;
mod status;
mod status_code;

pub use failure::{Failure, FailureKind};
pub use json::{JsonPrinter, SerializeError, StatusSerializer};
pub use mapper::{INTERNAL_MESSAGE, map_failure};
pub use status::{Any, StructuredStatus};
pub use status_code::http_status;
pub use tonic::Code;
