use crate::core::notifier::CmsNotifier;
use crate::core::prepare::{IndexSeed, MergeContext};
use crate::domain::model::{Item, ItemField, NewPackage, Package, Resource, ResourceInfo};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait Cms: Send + Sync {
    async fn get_item(&self, id: &str, with_assets: bool) -> Result<Item>;
    async fn comment_to_item(&self, id: &str, content: &str) -> Result<()>;
    async fn update_item(&self, id: &str, fields: Vec<ItemField>) -> Result<Item>;
}

#[async_trait]
pub trait Ckan: Send + Sync {
    /// `Ok(None)` when the catalog has no package with that name or id.
    async fn find_package(&self, name_or_id: &str) -> Result<Option<Package>>;
    async fn create_package(&self, package: &NewPackage) -> Result<Package>;
    async fn patch_package(&self, id: &str, package: &NewPackage) -> Result<Package>;
    async fn create_resource(&self, package_id: &str, info: &ResourceInfo) -> Result<Resource>;
    async fn patch_resource(&self, resource_id: &str, info: &ResourceInfo) -> Result<Resource>;
    async fn reorder_resources(&self, package_id: &str, resource_ids: &[String]) -> Result<()>;
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download_to(&self, url: &str, dir: &Path) -> Result<PathBuf>;
}

/// Output of a preparation step that produces a merged archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedArtifact {
    pub path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// The geospatial preparation steps. Implementations own the merging and
/// validation of CityGML / 3D Tiles / MVT data.
#[async_trait]
pub trait Preparer: Send + Sync {
    async fn prepare_maxlod(&self, notifier: &CmsNotifier<'_>, mc: &MergeContext) -> Result<()>;
    async fn validate_maxlod(&self, notifier: &CmsNotifier<'_>, mc: &MergeContext) -> Result<()>;
    async fn prepare_related(
        &self,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact>;
    async fn prepare_citygml(
        &self,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact>;
    async fn prepare_plateau(
        &self,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact>;
    async fn prepare_index(
        &self,
        notifier: &CmsNotifier<'_>,
        seed: &IndexSeed,
        mc: &MergeContext,
    ) -> Result<()>;
}
