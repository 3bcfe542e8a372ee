//! Types shared between the feedback widget engine and its hosts: configuration,
//! wire payloads, route constants and the error taxonomy.

pub mod domain;
pub mod error;
pub mod protocol;
