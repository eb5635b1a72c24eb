//! # Portal Core
//!
//! Domain model, ports and services of the news portal.
//! Nothing in this crate talks to a database, a mail server or the network;
//! adapters for those live in `portal-infra`.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError};
