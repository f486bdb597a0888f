use crate::core::seed::{get_seed, PackageSeed, Seed};
use crate::domain::model::{CityItem, Package, Resource, ResourceInfo};
use crate::domain::ports::{Ckan, Cms};
use crate::utils::error::{PlateauError, Result, ResultExt};
use crate::utils::format::{extract_version_from_resource_name, replace_size, strip_version_suffix};

const INDEX_MAP_DESCRIPTION: &str = "データ整備範囲の標準地域メッシュ（２次メッシュ、３次メッシュ）のメッシュとメッシュ番号を示したPDFファイルです。";

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub package: Package,
    pub created: bool,
    pub resources: Vec<Resource>,
    pub url: String,
}

/// Publishes the merged artifacts of a city to the CKAN catalog.
pub struct Publisher<C: Cms, K: Ckan> {
    cms: C,
    ckan: K,
    ckan_base: String,
    ckan_org: String,
    private: bool,
}

impl<C: Cms, K: Ckan> Publisher<C, K> {
    pub fn new(cms: C, ckan: K, ckan_base: &str, ckan_org: &str) -> Self {
        Self {
            cms,
            ckan,
            ckan_base: ckan_base.to_string(),
            ckan_org: ckan_org.to_string(),
            private: false,
        }
    }

    /// Newly created packages start private. Existing packages keep their visibility.
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn package_url(&self, pkg: &Package) -> String {
        format!("{}/dataset/{}", self.ckan_base.trim_end_matches('/'), pkg.name)
    }

    pub async fn publish(&self, city_item_id: &str) -> Result<PublishReport> {
        let raw = match self.cms.get_item(city_item_id, false).await {
            Ok(raw) => raw,
            Err(e) => {
                let err = PlateauError::Context {
                    context: "failed to get city item".to_string(),
                    source: Box::new(e),
                };
                self.comment_failure(city_item_id, "", &err).await;
                return Err(err);
            }
        };
        let city = CityItem::from_item(&raw, &[]);

        match self.publish_city(&city).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.comment_failure(&city.id, &city.geospatialjp_data, &err)
                    .await;
                Err(err)
            }
        }
    }

    async fn comment_failure(&self, city_item_id: &str, data_item_id: &str, err: &PlateauError) {
        let comment = format!("Failed to publish the dataset to the catalog: {}", err);

        if let Err(e) = self.cms.comment_to_item(city_item_id, &comment).await {
            tracing::error!("failed to comment to city item: {}", e);
        }

        if data_item_id.is_empty() {
            return;
        }
        if let Err(e) = self.cms.comment_to_item(data_item_id, &comment).await {
            tracing::error!("failed to comment to data item: {}", e);
        }
    }

    pub async fn publish_city(&self, city: &CityItem) -> Result<PublishReport> {
        tracing::info!("publish: {}", city.id);

        let seed = get_seed(&self.cms, city).await.context("failed to get seed")?;
        tracing::debug!("seed: {:?}", seed);

        if !seed.valid() {
            return Err(PlateauError::NoUploadableItems);
        }

        let pkg_seed = PackageSeed::from_city(city, &seed, &self.ckan_org);
        let (pkg, created) = self
            .create_or_update_package(&pkg_seed)
            .await
            .context("failed to find or create package on CKAN")?;
        tracing::debug!("pkg: {:?}", pkg);

        let resources = self.register_resources(&pkg, &seed).await?;

        if !resources.is_empty() {
            let ids: Vec<String> = resources.iter().map(|r| r.id.clone()).collect();
            tracing::debug!("reorder: {:?}", ids);
            self.ckan.reorder_resources(&pkg.id, &ids).await.context(
                "failed to reorder resources on CKAN (resources themselves are already registered)",
            )?;
        }

        let url = self.package_url(&pkg);
        let comment = if created {
            format!("Created the dataset on the catalog.\n{}", url)
        } else {
            format!("Updated the dataset on the catalog.\n{}", url)
        };

        if let Err(e) = self
            .cms
            .comment_to_item(&seed.gspatialjp_data_item_id, &comment)
            .await
        {
            tracing::error!("failed to comment to data item: {}", e);
        }
        if let Err(e) = self.cms.comment_to_item(&city.id, &comment).await {
            tracing::error!("failed to comment to city item: {}", e);
        }

        Ok(PublishReport {
            package: pkg,
            created,
            resources,
            url,
        })
    }

    async fn register_resources(&self, pkg: &Package, seed: &Seed) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let v = seed.v;

        if !seed.index.is_empty() {
            tracing::debug!("index: {}", seed.index_url);
            let info = ResourceInfo {
                name: format!("データ目録（v{}）", v),
                url: seed.index_url.clone(),
                description: seed.index.clone(),
            };
            resources.push(self.resource(pkg, info, "index").await?);
        }

        if !seed.index_map_url.is_empty() {
            tracing::debug!("index map: {}", seed.index_map_url);
            let info = ResourceInfo {
                name: format!("索引図（v{}）", v),
                url: seed.index_map_url.clone(),
                description: INDEX_MAP_DESCRIPTION.to_string(),
            };
            resources.push(self.resource(pkg, info, "index map").await?);
        }

        if !seed.citygml.is_empty() {
            tracing::debug!("citygml: {}", seed.citygml);
            let info = ResourceInfo {
                name: format!("CityGML（v{}）", v),
                url: seed.citygml.clone(),
                description: seed.citygml_description.clone(),
            };
            resources.push(self.resource(pkg, info, "CityGML").await?);
        }

        if !seed.plateau.is_empty() {
            tracing::debug!("plateau: {}", seed.plateau);
            let info = ResourceInfo {
                name: format!("3D Tiles, MVT（v{}）", v),
                url: seed.plateau.clone(),
                description: seed.plateau_description.clone(),
            };
            resources.push(self.resource(pkg, info, "3D Tiles, MVT").await?);
        }

        if !seed.related.is_empty() {
            tracing::debug!("related: {}", seed.related);
            let info = ResourceInfo {
                name: format!("関連データセット（v{}）", v),
                url: seed.related.clone(),
                description: seed.related_description.clone(),
            };
            resources.push(self.resource(pkg, info, "related datasets").await?);
        }

        for generic in &seed.generics {
            let Some(asset) = generic.asset.as_ref().filter(|a| !a.url.is_empty()) else {
                continue;
            };

            if generic.name.is_empty() {
                return Err(PlateauError::invalid_item(format!(
                    "generic dataset name is required: {:?}",
                    generic
                )));
            }

            if asset.total_size == 0 {
                return Err(PlateauError::invalid_item(format!(
                    "could not determine the asset size of generic dataset: {:?}",
                    generic
                )));
            }

            let info = ResourceInfo {
                name: generic.name.clone(),
                url: asset.url.clone(),
                description: replace_size(&generic.desc, asset.total_size),
            };
            resources.push(self.resource(pkg, info, "generic dataset").await?);
        }

        Ok(resources)
    }

    async fn resource(&self, pkg: &Package, info: ResourceInfo, label: &str) -> Result<Resource> {
        self.create_or_update_resource(pkg, &info)
            .await
            .context(format!("failed to create or update resource on CKAN ({})", label))
    }

    /// Returns the package and whether it was newly created.
    pub async fn create_or_update_package(&self, seed: &PackageSeed) -> Result<(Package, bool)> {
        match self.ckan.find_package(&seed.name).await? {
            Some(existing) => {
                tracing::info!("package found: {}", existing.name);
                let pkg = self
                    .ckan
                    .patch_package(&existing.id, &seed.to_new_package(None))
                    .await?;
                Ok((pkg, false))
            }
            None => {
                tracing::info!("package not found, creating: {}", seed.name);
                let pkg = self
                    .ckan
                    .create_package(&seed.to_new_package(Some(self.private)))
                    .await?;
                Ok((pkg, true))
            }
        }
    }

    /// Updates the resource of the same kind and version, or creates a new one.
    /// Resources of other versions are left untouched.
    pub async fn create_or_update_resource(
        &self,
        pkg: &Package,
        info: &ResourceInfo,
    ) -> Result<Resource> {
        let stem = strip_version_suffix(&info.name);
        let version = extract_version_from_resource_name(&info.name);

        let existing = pkg.resources.iter().find(|r| {
            strip_version_suffix(&r.name) == stem
                && extract_version_from_resource_name(&r.name) == version
        });

        match existing {
            Some(r) => {
                tracing::debug!("updating resource {} ({})", r.name, r.id);
                self.ckan.patch_resource(&r.id, info).await
            }
            None => {
                tracing::debug!("creating resource {}", info.name);
                self.ckan.create_resource(&pkg.id, info).await
            }
        }
    }
}
