use crate::core::notifier::CmsNotifier;
use crate::domain::model::{
    CityItem, FeatureItem, GenericItem, GspatialjpDataItem, GspatialjpIndexItem,
};
use crate::domain::ports::{Cms, Downloader, Preparer};
use crate::utils::error::{PlateauError, Result, ResultExt};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_TMP_DIR_BASE: &str = "plateau-gspatial-tmp";

#[derive(Debug, Clone, Default)]
pub struct PrepareConfig {
    pub city_item_id: String,
    pub skip_citygml: bool,
    pub skip_plateau: bool,
    pub skip_maxlod: bool,
    pub skip_index: bool,
    pub skip_related: bool,
    pub validate_maxlod: bool,
    pub wet_run: bool,
    pub clean: bool,
    pub skip_incomplete_items: bool,
    pub ignore_status: bool,
    pub feature_types: Vec<String>,
    pub tmp_dir_base: PathBuf,
}

impl PrepareConfig {
    fn nothing_to_run(&self) -> bool {
        self.skip_citygml
            && self.skip_plateau
            && self.skip_maxlod
            && self.skip_related
            && self.skip_index
            && !self.validate_maxlod
    }
}

/// Everything a preparation step needs to know about the city being merged.
#[derive(Debug, Clone)]
pub struct MergeContext {
    pub tmp_dir: PathBuf,
    pub city_item: CityItem,
    pub all_feature_items: BTreeMap<String, FeatureItem>,
    pub gspatialjp_data_item: GspatialjpDataItem,
    pub wet_run: bool,
    pub feature_types: Vec<String>,
}

impl MergeContext {
    pub fn file_name(&self, ty: &str, suffix: &str) -> String {
        self.city_item.file_name(ty, suffix)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSeed {
    pub city_name: String,
    pub city_code: String,
    pub year: u32,
    pub v: u32,
    pub citygml_zip_path: PathBuf,
    pub plateau_zip_path: PathBuf,
    pub related_zip_path: Option<PathBuf>,
    pub generics: Vec<GenericItem>,
    pub dic: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Completed,
    Skipped(String),
}

/// Prepares every artifact of a single city for publication.
pub async fn command_single<C, P, D>(
    cms: &C,
    preparer: &P,
    downloader: &D,
    mut conf: PrepareConfig,
) -> Result<PrepareOutcome>
where
    C: Cms,
    P: Preparer,
    D: Downloader,
{
    tracing::info!("prepare: {:?}", conf);

    if conf.nothing_to_run() {
        return Err(PlateauError::NoCommand);
    }

    if conf.feature_types.is_empty() {
        return Err(PlateauError::MissingConfigError {
            field: "feature_types".to_string(),
        });
    }

    tracing::info!("getting item from CMS...");
    let city_item_raw = cms
        .get_item(&conf.city_item_id, true)
        .await
        .context("failed to get city item")?;
    tracing::debug!("city item raw: {:?}", city_item_raw);

    let city_item = CityItem::from_item(&city_item_raw, &conf.feature_types);
    tracing::info!("city item: {:?}", city_item);

    if !city_item.is_complete() {
        if conf.skip_incomplete_items {
            tracing::info!("skip because city item is incomplete");
            return Ok(PrepareOutcome::Skipped("city item is incomplete".to_string()));
        }
        return Err(PlateauError::invalid_item(format!(
            "invalid city item: {}",
            conf.city_item_id
        )));
    }

    let index_item_raw = cms
        .get_item(&city_item.geospatialjp_index, false)
        .await
        .context("failed to get index item")?;
    let index_item = GspatialjpIndexItem::from_item(&index_item_raw);
    tracing::info!("geospatialjp index item: {:?}", index_item);

    let gdata_item_raw = cms
        .get_item(&city_item.geospatialjp_data, true)
        .await
        .context("failed to get geospatialjp data item")?;
    let gdata_item = GspatialjpDataItem::from_item(&gdata_item_raw);
    tracing::info!("geospatialjp data item: {:?}", gdata_item);

    if !conf.ignore_status {
        if !gdata_item.should_merge_citygml() {
            tracing::info!("skip citygml because status is running");
            conf.skip_citygml = true;
        }
        if !gdata_item.should_merge_plateau() {
            tracing::info!("skip plateau because status is running");
            conf.skip_plateau = true;
        }
        if !gdata_item.should_merge_maxlod() {
            tracing::info!("skip maxlod because status is running");
            conf.skip_maxlod = true;
        }
    }

    if conf.nothing_to_run() {
        return Err(PlateauError::NoCommand);
    }

    let mut notifier = CmsNotifier::new(
        cms,
        &conf.city_item_id,
        &city_item.geospatialjp_data,
        conf.wet_run,
    );
    notifier.skip_citygml = conf.skip_citygml;
    notifier.skip_plateau = conf.skip_plateau;
    notifier.skip_maxlod = conf.skip_maxlod;
    notifier.skip_index = conf.skip_index;

    if city_item.year_int() == 0 {
        return reject_incomplete(
            &notifier,
            &conf,
            "year",
            format!("invalid year: {}", city_item.year),
        )
        .await;
    }

    if city_item.spec_version_major_int() == 0 {
        return reject_incomplete(
            &notifier,
            &conf,
            "spec version",
            format!("invalid spec version: {}", city_item.spec),
        )
        .await;
    }

    if city_item.update_count() == 0 {
        return reject_incomplete(
            &notifier,
            &conf,
            "update count",
            format!(
                "invalid update count: the code lists file name must contain a marker like `_1_op_`: {}",
                city_item.code_lists
            ),
        )
        .await;
    }

    let tmp_dir = create_tmp_dir(&conf.tmp_dir_base).await?;
    tracing::info!("tmp dir: {}", tmp_dir.display());

    let result = run_steps(
        &notifier,
        preparer,
        downloader,
        &conf,
        city_item,
        index_item,
        gdata_item,
        &tmp_dir,
    )
    .await;

    if conf.clean {
        tracing::info!("cleaning up tmp dir...: {}", tmp_dir.display());
        if let Err(e) = tokio::fs::remove_dir_all(&tmp_dir).await {
            tracing::warn!("failed to remove tmp dir: {}", e);
        }
    }

    result
}

async fn reject_incomplete(
    notifier: &CmsNotifier<'_>,
    conf: &PrepareConfig,
    what: &str,
    message: String,
) -> Result<PrepareOutcome> {
    if conf.skip_incomplete_items {
        tracing::info!("skip because {} is invalid", what);
        return Ok(PrepareOutcome::Skipped(format!("{} is invalid", what)));
    }

    notifier
        .comment(&format!("Cannot start preparation: {}", message))
        .await;
    Err(PlateauError::invalid_item(message))
}

#[allow(clippy::too_many_arguments)]
async fn run_steps<P: Preparer, D: Downloader>(
    notifier: &CmsNotifier<'_>,
    preparer: &P,
    downloader: &D,
    conf: &PrepareConfig,
    city_item: CityItem,
    index_item: GspatialjpIndexItem,
    gdata_item: GspatialjpDataItem,
    tmp_dir: &Path,
) -> Result<PrepareOutcome> {
    tracing::info!("getting all feature items...");
    let all_feature_items = match get_all_feature_items(notifier.cms(), &city_item).await {
        Ok(items) => items,
        Err(e) => {
            notifier
                .notify_error(&e, !conf.skip_citygml, !conf.skip_plateau, !conf.skip_maxlod)
                .await;
            return Err::<PrepareOutcome, _>(e).context("failed to get all feature items");
        }
    };
    tracing::info!("feature items: {:?}", all_feature_items);

    let dic = merge_dics(&all_feature_items);
    tracing::debug!("dic: {:?}", dic);

    let mc = MergeContext {
        tmp_dir: tmp_dir.to_path_buf(),
        city_item,
        all_feature_items,
        gspatialjp_data_item: gdata_item,
        wet_run: conf.wet_run,
        feature_types: conf.feature_types.clone(),
    };

    notifier.notify_running().await;

    if !conf.skip_maxlod {
        preparer.prepare_maxlod(notifier, &mc).await?;
    } else if conf.validate_maxlod {
        preparer.validate_maxlod(notifier, &mc).await?;
    }

    let mut related_path = None;
    if !conf.skip_related {
        related_path = preparer.prepare_related(notifier, &mc).await?.path;
    }
    if related_path.is_none() && !conf.skip_index {
        related_path = download_merged(downloader, mc.gspatialjp_data_item.related_url(), tmp_dir)
            .await
            .context("failed to download merged related")?;
    }

    let mut citygml_path = None;
    if !conf.skip_citygml {
        citygml_path = preparer.prepare_citygml(notifier, &mc).await?.path;
    }
    if citygml_path.is_none() && !conf.skip_index {
        citygml_path = download_merged(downloader, mc.gspatialjp_data_item.citygml_url(), tmp_dir)
            .await
            .context("failed to download merged citygml")?;
    }

    let mut plateau_path = None;
    if !conf.skip_plateau {
        let artifact = preparer.prepare_plateau(notifier, &mc).await?;
        if !artifact.warnings.is_empty() {
            notifier
                .comment(&format!(
                    "Warnings during preparation:\n{}",
                    artifact.warnings.join("\n")
                ))
                .await;
        }
        plateau_path = artifact.path;
    }
    if plateau_path.is_none() && !conf.skip_index {
        plateau_path = download_merged(downloader, mc.gspatialjp_data_item.plateau_url(), tmp_dir)
            .await
            .context("failed to download merged plateau")?;
    }

    tracing::info!("citygml path: {:?}", citygml_path);
    tracing::info!("plateau path: {:?}", plateau_path);

    match (conf.skip_index, citygml_path, plateau_path) {
        (false, Some(citygml_zip_path), Some(plateau_zip_path)) => {
            let seed = IndexSeed {
                city_name: mc.city_item.city_name.clone(),
                city_code: mc.city_item.city_code.clone(),
                year: mc.city_item.year_int(),
                v: mc.city_item.spec_version_major_int(),
                citygml_zip_path,
                plateau_zip_path,
                related_zip_path: related_path,
                generics: index_item.generics,
                dic,
            };
            preparer.prepare_index(notifier, &seed, &mc).await?;
        }
        _ => tracing::info!("skip index"),
    }

    notifier.comment("Preparation completed.").await;
    tracing::info!("done");
    Ok(PrepareOutcome::Completed)
}

async fn download_merged<D: Downloader>(
    downloader: &D,
    url: &str,
    tmp_dir: &Path,
) -> Result<Option<PathBuf>> {
    if url.is_empty() {
        return Ok(None);
    }
    downloader.download_to(url, tmp_dir).await.map(Some)
}

async fn get_all_feature_items(
    cms: &dyn Cms,
    city_item: &CityItem,
) -> Result<BTreeMap<String, FeatureItem>> {
    let mut items = BTreeMap::new();
    for (ty, id) in &city_item.feature_items {
        let raw = cms
            .get_item(id, true)
            .await
            .context(format!("failed to get feature item ({})", ty))?;
        items.insert(ty.clone(), FeatureItem::from_item(&raw, ty));
    }
    Ok(items)
}

/// Feature dictionaries keyed by feature type. Malformed dictionaries are skipped.
pub fn merge_dics(items: &BTreeMap<String, FeatureItem>) -> BTreeMap<String, serde_json::Value> {
    let mut dic = BTreeMap::new();
    for (ty, item) in items {
        let Some(raw) = item.dic.as_deref() else {
            continue;
        };
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => {
                dic.insert(ty.clone(), value);
            }
            Err(e) => tracing::warn!("invalid dic of feature item {} ({}): {}", item.id, ty, e),
        }
    }
    dic
}

async fn create_tmp_dir(base: &Path) -> Result<PathBuf> {
    let base = if base.as_os_str().is_empty() {
        Path::new(DEFAULT_TMP_DIR_BASE)
    } else {
        base
    };
    let name = format!(
        "{}-{}",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        rand::thread_rng().gen_range(0..1000)
    );
    let dir = base.join(name);
    tokio::fs::create_dir_all(&dir)
        .await
        .context("failed to create tmp dir")?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_to_run() {
        let conf = PrepareConfig {
            skip_citygml: true,
            skip_plateau: true,
            skip_maxlod: true,
            skip_index: true,
            skip_related: true,
            ..Default::default()
        };
        assert!(conf.nothing_to_run());

        let conf = PrepareConfig {
            validate_maxlod: true,
            ..conf
        };
        assert!(!conf.nothing_to_run());
    }

    #[test]
    fn test_merge_dics_skips_invalid_json() {
        let mut items = BTreeMap::new();
        items.insert(
            "bldg".to_string(),
            FeatureItem {
                id: "f1".to_string(),
                feature_type: "bldg".to_string(),
                dic: Some(r#"{"admin": [{"code": "1", "description": "A"}]}"#.to_string()),
                ..Default::default()
            },
        );
        items.insert(
            "tran".to_string(),
            FeatureItem {
                id: "f2".to_string(),
                feature_type: "tran".to_string(),
                dic: Some("{broken".to_string()),
                ..Default::default()
            },
        );
        items.insert(
            "luse".to_string(),
            FeatureItem {
                id: "f3".to_string(),
                feature_type: "luse".to_string(),
                ..Default::default()
            },
        );

        let dic = merge_dics(&items);
        assert_eq!(dic.len(), 1);
        assert_eq!(dic["bldg"]["admin"][0]["code"], "1");
    }

    #[tokio::test]
    async fn test_create_tmp_dir() {
        let base = tempfile::TempDir::new().unwrap();
        let dir = create_tmp_dir(base.path()).await.unwrap();
        assert!(dir.is_dir());
        assert!(dir.starts_with(base.path()));
    }
}
