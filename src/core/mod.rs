pub mod notifier;
pub mod prepare;
pub mod publish;
pub mod seed;

pub use crate::domain::model::{CityItem, Item, Package, Resource};
pub use crate::domain::ports::{Ckan, Cms, Downloader, Preparer};
pub use crate::utils::error::Result;
