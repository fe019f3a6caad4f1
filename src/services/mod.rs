//! Services for loading, bucketing, aggregating, and evaluating check-in data

pub mod aggregator;
pub mod bucketer;
pub mod budget;
pub mod category_mapper;
pub mod clock;
pub mod data_loader;
pub mod habits;
pub mod report;
pub mod store;

pub use aggregator::{AggFn, Aggregator};
pub use category_mapper::{map_categories, CategoryTable};
pub use data_loader::{DashboardContext, DataLoaderService};
pub use store::{Extract, ExtractStore, FileExtractStore, MemoryExtractStore};
