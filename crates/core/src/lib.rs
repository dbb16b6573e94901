//! `nutri-core` — shared building blocks for the clinic platform.
//!
//! Only pure types live here (identifiers, the domain error model); no IO.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AccessLogId, TenantId, UserId};
