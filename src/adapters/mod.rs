// Adapters layer: concrete clients for the external systems behind the domain ports.

pub mod cms;
pub mod ckan;
pub mod download;
pub mod preparer;

pub use cms::HttpCms;
pub use ckan::HttpCkan;
pub use download::HttpDownloader;
pub use preparer::CommandPreparer;
