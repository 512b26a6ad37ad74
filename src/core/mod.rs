pub mod dataset_cache;
pub mod dataset_loader;
pub mod etl;
pub mod weather;

pub use crate::domain::model::Table;
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
