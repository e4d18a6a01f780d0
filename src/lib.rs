//! Schema Contracts
//!
//! Keeps a JSON endpoint honest: each run samples the endpoint, checks the
//! response against the last accepted *contract* schema, infers a fresh schema
//! from the sample, and emits type definitions for consumers.
//!
//! ## Features
//!
//! - **Structural Inference**: Draft-07 schemas inferred from one sample
//! - **Required Tightening**: every observed property becomes required, plus
//!   configured forced-required overrides
//! - **Contract Enforcement**: strict validation against the accepted contract,
//!   reporting every violation at once
//! - **Explicit Promotion**: the contract only advances in accept mode, via an
//!   atomic byte-for-byte copy
//! - **Type Emission**: TypeScript declarations or serde Rust types
//!
//! ## Architecture
//!
//! ```text
//! SampleSource ──► Pipeline ──► ContractValidator (strict, contract)
//!                     │     ──► infer + normalize ──► ContractStore (generated)
//!                     │     ──► ContractValidator (sanitize, generated)
//!                     │     ──► ContractStore::promote (accept mode)
//!                     └────► codegen ──► TypesSink
//! ```

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod diff;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod infer;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod site;
pub mod store;
pub mod validator;

pub use checksum::Checksum;
pub use codegen::TypeLanguage;
pub use config::{ContractConfig, ProjectPaths};
pub use endpoint::{Endpoint, EndpointId, RouteDescriptor};
pub use error::{ContractError, FetchError, Result, StoreError, TypeEmissionError};
pub use pipeline::{ContractCheck, Pipeline, PipelineFailure, RunOptions, RunReport, Stage};
pub use schema::Schema;
pub use store::{Artifact, ContractStore};
pub use validator::{ContractValidator, ValidationMode, ValidationResult, Violation};
