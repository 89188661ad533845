//! HTTP API handlers for lcx-export

pub mod export;
pub mod health;
pub mod licenses;
pub mod software_heritage;

pub use export::export_list;
pub use health::health_routes;
pub use licenses::list_licenses;
pub use software_heritage::software_heritage_record;
