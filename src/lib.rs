pub mod analytics;
pub mod cycles;
pub mod db;
pub mod error;
pub mod headers;
pub mod http;
pub mod import;
pub mod models;
pub mod rating;
pub mod report;
pub mod repository;
pub mod sheet;
pub mod text;
pub mod transform;

pub use http::{build_router, AppState};
pub use repository::{MemoryRepository, Repository};
