pub mod catalog;
pub mod download;
pub mod local;

pub use catalog::{fetch_resources, first_data_resource, Resource};
pub use download::{download_resource, ResourceMetadata};
pub use local::latest_local_artifact;
