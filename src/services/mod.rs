//! Business logic services layer

pub mod access_service;
pub mod audit_service;
pub mod resolver;

pub use access_service::AccessService;
pub use audit_service::{AuditAction, AuditService};
pub use resolver::CapabilityResolver;
