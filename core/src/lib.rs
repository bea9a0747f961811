//! Outbound call layer for a single upstream REST API.
//!
//! # Overview
//! Builds `HttpRequest` values from operation descriptors and resolves
//! transport outcomes into typed values or a fixed error taxonomy. The
//! network round-trip sits behind the `Transport` trait, so the builder and
//! resolver stay pure and deterministic.
//!
//! # Design
//! - `EndpointConfig` is constructed once and never mutated.
//! - `builder::build` fails locally with `InvalidDescriptor`; nothing is sent.
//! - `resolver` maps each outcome exactly once: no retries, no loops.
//! - `ResourceClient` wires one method per upstream operation.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod builder;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod resolver;
pub mod transport;
pub mod types;

pub use client::ResourceClient;
pub use config::{ConfigError, EndpointConfig};
pub use descriptor::{Body, BodyEncoding, OperationDescriptor};
pub use error::{ApiError, ErrorEnvelope};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resolver::{Outcome, StatusHandlers};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{FormData, FullResponse, PartialUpdate, Resource, ResourcePayload};
