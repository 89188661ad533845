//! Database schema, models and queries

pub mod agent;
pub mod clearing;
pub mod copyright;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod init;
pub mod license;
pub mod models;
pub mod software_heritage;
pub mod sysconfig;
pub mod upload;

pub use init::*;
pub use models::*;
