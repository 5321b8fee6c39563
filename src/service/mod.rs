//! Service layer: the facade and the role capabilities it enforces

pub mod auth;
pub mod facade;

pub use auth::{Capability, Principal, Role};
pub use facade::CourtService;
