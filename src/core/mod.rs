//! Tidewire - Core types
//!
//! Constants, the error taxonomy, address families, configuration, the
//! resolution collaborator and the shared transport capability.

mod config;
pub mod constants;
mod error;
mod family;
mod resolve;
mod traits;

pub use config::{TransportConfig, TransportConfigBuilder};
pub use error::{FailureKind, Operation, SetupStage, TransportError, TransportResult};
pub use family::{AddressFamily, Family, Inet4, Inet6};
pub use resolve::{resolve_first, Resolver, StaticResolver, SystemResolver};
pub use traits::{Transport, TransportKind};
