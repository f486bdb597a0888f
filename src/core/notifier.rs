use crate::domain::model::{GspatialjpDataItem, ItemField, MergeStatus};
use crate::domain::ports::Cms;
use crate::utils::error::PlateauError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    CityGml,
    Plateau,
    MaxLod,
}

impl MergeKind {
    fn status_key(&self) -> &'static str {
        match self {
            Self::CityGml => GspatialjpDataItem::CITYGML_STATUS,
            Self::Plateau => GspatialjpDataItem::PLATEAU_STATUS,
            Self::MaxLod => GspatialjpDataItem::MAXLOD_STATUS,
        }
    }

    fn asset_key(&self) -> &'static str {
        match self {
            Self::CityGml => "citygml",
            Self::Plateau => "plateau",
            Self::MaxLod => "maxlod",
        }
    }
}

/// Writes progress back to the CMS data item during preparation.
///
/// Every write is best effort: failures are logged and never abort the run.
/// Without `wet_run` nothing is written at all.
pub struct CmsNotifier<'a> {
    cms: &'a dyn Cms,
    pub data_item_id: String,
    pub city_item_id: String,
    pub skip_citygml: bool,
    pub skip_plateau: bool,
    pub skip_maxlod: bool,
    pub skip_index: bool,
    pub wet_run: bool,
}

impl<'a> CmsNotifier<'a> {
    pub fn new(cms: &'a dyn Cms, city_item_id: &str, data_item_id: &str, wet_run: bool) -> Self {
        Self {
            cms,
            data_item_id: data_item_id.to_string(),
            city_item_id: city_item_id.to_string(),
            skip_citygml: false,
            skip_plateau: false,
            skip_maxlod: false,
            skip_index: false,
            wet_run,
        }
    }

    pub fn cms(&self) -> &dyn Cms {
        self.cms
    }

    pub async fn comment(&self, content: &str) {
        if !self.wet_run {
            tracing::info!("dry run, skip comment: {}", content);
            return;
        }

        if let Err(e) = self.cms.comment_to_item(&self.data_item_id, content).await {
            tracing::error!("failed to comment to data item {}: {}", self.data_item_id, e);
        }
    }

    pub async fn notify_running(&self) {
        let mut kinds = Vec::new();
        if !self.skip_citygml {
            kinds.push(MergeKind::CityGml);
        }
        if !self.skip_plateau {
            kinds.push(MergeKind::Plateau);
        }
        if !self.skip_maxlod {
            kinds.push(MergeKind::MaxLod);
        }

        self.update_statuses(&kinds, MergeStatus::Running).await;
    }

    pub async fn notify_error(&self, err: &PlateauError, citygml: bool, plateau: bool, maxlod: bool) {
        self.comment(&format!("Preparation failed: {}", err)).await;

        let kinds: Vec<MergeKind> = [
            (citygml, MergeKind::CityGml),
            (plateau, MergeKind::Plateau),
            (maxlod, MergeKind::MaxLod),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect();

        self.update_statuses(&kinds, MergeStatus::Failed).await;
    }

    /// Marks a merge as succeeded, attaching the uploaded asset when given.
    pub async fn notify_success(&self, kind: MergeKind, asset_id: Option<&str>) {
        let mut fields = vec![ItemField::new(
            kind.status_key(),
            "select",
            MergeStatus::Success.as_cms_value(),
        )];
        if let Some(asset_id) = asset_id {
            fields.push(ItemField::new(kind.asset_key(), "asset", asset_id));
        }

        self.update_fields(fields).await;
    }

    async fn update_statuses(&self, kinds: &[MergeKind], status: MergeStatus) {
        let fields: Vec<ItemField> = kinds
            .iter()
            .map(|k| ItemField::new(k.status_key(), "select", status.as_cms_value()))
            .collect();

        self.update_fields(fields).await;
    }

    async fn update_fields(&self, fields: Vec<ItemField>) {
        if fields.is_empty() {
            return;
        }

        if !self.wet_run {
            tracing::info!(
                "dry run, skip updating {} field(s) of data item {}",
                fields.len(),
                self.data_item_id
            );
            return;
        }

        tracing::debug!("updating data item {}: {:?}", self.data_item_id, fields);
        if let Err(e) = self.cms.update_item(&self.data_item_id, fields).await {
            tracing::error!("failed to update data item {}: {}", self.data_item_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Item;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCms {
        comments: Mutex<Vec<(String, String)>>,
        updates: Mutex<Vec<(String, Vec<ItemField>)>>,
        fail: bool,
    }

    #[async_trait]
    impl Cms for RecordingCms {
        async fn get_item(&self, id: &str, _with_assets: bool) -> Result<Item> {
            Err(PlateauError::cms(format!("not found: {}", id)))
        }

        async fn comment_to_item(&self, id: &str, content: &str) -> Result<()> {
            if self.fail {
                return Err(PlateauError::cms("unavailable"));
            }
            self.comments
                .lock()
                .unwrap()
                .push((id.to_string(), content.to_string()));
            Ok(())
        }

        async fn update_item(&self, id: &str, fields: Vec<ItemField>) -> Result<Item> {
            if self.fail {
                return Err(PlateauError::cms("unavailable"));
            }
            self.updates.lock().unwrap().push((id.to_string(), fields));
            Ok(Item::default())
        }
    }

    #[tokio::test]
    async fn test_notify_running_skips_disabled_merges() {
        let cms = RecordingCms::default();
        let mut notifier = CmsNotifier::new(&cms, "city1", "data1", true);
        notifier.skip_plateau = true;

        notifier.notify_running().await;

        let updates = cms.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "data1");
        let keys: Vec<&str> = updates[0].1.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["merge_citygml_status", "merge_maxlod_status"]);
        assert_eq!(updates[0].1[0].value, "実行中");
    }

    #[tokio::test]
    async fn test_notify_error_comments_and_marks_failed() {
        let cms = RecordingCms::default();
        let notifier = CmsNotifier::new(&cms, "city1", "data1", true);

        notifier
            .notify_error(&PlateauError::prepare("boom"), true, false, false)
            .await;

        let comments = cms.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].1.contains("boom"));

        let updates = cms.updates.lock().unwrap();
        assert_eq!(updates[0].1.len(), 1);
        assert_eq!(updates[0].1[0].key, "merge_citygml_status");
        assert_eq!(updates[0].1[0].value, "失敗");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let cms = RecordingCms::default();
        let notifier = CmsNotifier::new(&cms, "city1", "data1", false);

        notifier.comment("hello").await;
        notifier.notify_running().await;
        notifier.notify_success(MergeKind::Plateau, Some("asset1")).await;

        assert!(cms.comments.lock().unwrap().is_empty());
        assert!(cms.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cms_failures_are_swallowed() {
        let cms = RecordingCms {
            fail: true,
            ..Default::default()
        };
        let notifier = CmsNotifier::new(&cms, "city1", "data1", true);

        notifier.comment("hello").await;
        notifier.notify_success(MergeKind::CityGml, None).await;
    }
}
