use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static UPDATE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)_op_").expect("valid regex"));

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

// ---------------------------------------------------------------------------
// CMS
// ---------------------------------------------------------------------------

/// Raw CMS item as returned by the integration API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default, rename = "modelId")]
    pub model_id: String,
    #[serde(default)]
    pub fields: Vec<ItemField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ItemField {
    pub fn new(key: &str, field_type: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            id: None,
            key: key.to_string(),
            field_type: field_type.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub total_size: u64,
}

impl Item {
    pub fn field(&self, key: &str) -> Option<&ItemField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Text value of a field. Numbers are rendered, empty strings count as absent.
    pub fn string(&self, key: &str) -> Option<String> {
        match &self.field(key)?.value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Referenced item id; accepts a bare id or an embedded item object.
    pub fn reference(&self, key: &str) -> Option<String> {
        match &self.field(key)?.value {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Object(obj) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn asset(&self, key: &str) -> Option<Asset> {
        self.assets(key).into_iter().next()
    }

    /// Assets of a field. Only embedded asset objects carry a URL, so items
    /// must be fetched with assets for this to return anything.
    pub fn assets(&self, key: &str) -> Vec<Asset> {
        let Some(field) = self.field(key) else {
            return Vec::new();
        };

        let values = match &field.value {
            serde_json::Value::Array(values) => values.clone(),
            serde_json::Value::Null => Vec::new(),
            other => vec![other.clone()],
        };

        values
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Asset>(v).ok())
            .filter(|a| !a.url.is_empty())
            .collect()
    }

    /// Group or JSON array field decoded into `T`, skipping malformed entries.
    pub fn list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.field(key).map(|f| &f.value) {
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Status of a merge job as stored in the CMS select fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeStatus {
    #[default]
    NotStarted,
    Running,
    Success,
    Failed,
}

impl MergeStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "実行中" | "running" => Self::Running,
            "成功" | "success" => Self::Success,
            "失敗" | "failed" => Self::Failed,
            _ => Self::NotStarted,
        }
    }

    pub fn as_cms_value(&self) -> &'static str {
        match self {
            Self::NotStarted => "未実行",
            Self::Running => "実行中",
            Self::Success => "成功",
            Self::Failed => "失敗",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityItem {
    pub id: String,
    pub prefecture: String,
    pub city_name: String,
    pub city_name_en: String,
    pub city_code: String,
    pub year: String,
    pub spec: String,
    pub code_lists: String,
    pub geospatialjp_index: String,
    pub geospatialjp_data: String,
    /// feature type -> feature item id
    pub feature_items: BTreeMap<String, String>,
}

impl CityItem {
    pub fn from_item(item: &Item, feature_types: &[String]) -> Self {
        let feature_items = feature_types
            .iter()
            .filter_map(|ty| item.reference(ty).map(|id| (ty.clone(), id)))
            .collect();

        Self {
            id: item.id.clone(),
            prefecture: item.string("prefecture").unwrap_or_default(),
            city_name: item.string("city_name").unwrap_or_default(),
            city_name_en: item.string("city_name_en").unwrap_or_default(),
            city_code: item.string("city_code").unwrap_or_default(),
            year: item.string("year").unwrap_or_default(),
            spec: item.string("spec").unwrap_or_default(),
            code_lists: item
                .asset("codelists")
                .map(|a| a.url)
                .unwrap_or_default(),
            geospatialjp_index: item.reference("geospatialjp_index").unwrap_or_default(),
            geospatialjp_data: item.reference("geospatialjp_data").unwrap_or_default(),
            feature_items,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.city_code.is_empty()
            && !self.city_name.is_empty()
            && !self.city_name_en.is_empty()
            && !self.geospatialjp_data.is_empty()
    }

    /// Leading integer of the fiscal year ("2023年度" -> 2023), 0 when absent.
    pub fn year_int(&self) -> u32 {
        let digits: String = self
            .year
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().unwrap_or(0)
    }

    /// Major part of the spec version ("第3.2版" -> 3), 0 when absent.
    pub fn spec_version_major_int(&self) -> u32 {
        FIRST_NUMBER
            .captures(&self.spec)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0)
    }

    /// Update count encoded in the code lists file name (`..._1_op_...`).
    pub fn update_count(&self) -> u32 {
        let file_name = self
            .code_lists
            .rsplit('/')
            .next()
            .unwrap_or_default();
        UPDATE_COUNT
            .captures(file_name)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0)
    }

    pub fn file_name(&self, ty: &str, suffix: &str) -> String {
        format!(
            "{}_{}_{}_{}_{}_op{}",
            self.city_code,
            self.city_name_en,
            self.year_int(),
            ty,
            self.update_count(),
            suffix
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureItem {
    pub id: String,
    pub feature_type: String,
    pub citygml: Vec<String>,
    pub maxlod: Option<String>,
    pub dic: Option<String>,
}

impl FeatureItem {
    pub fn from_item(item: &Item, feature_type: &str) -> Self {
        Self {
            id: item.id.clone(),
            feature_type: feature_type.to_string(),
            citygml: item.assets("data").into_iter().map(|a| a.url).collect(),
            maxlod: item.asset("maxlod").map(|a| a.url),
            dic: item.string("dic"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, deserialize_with = "asset_or_id")]
    pub asset: Option<Asset>,
}

/// Group entries carry a bare asset id unless the item was fetched with assets.
fn asset_or_id<'de, D>(deserializer: D) -> std::result::Result<Option<Asset>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AssetRef {
        Id(String),
        Embedded(Asset),
    }

    Ok(match Option::<AssetRef>::deserialize(deserializer)? {
        Some(AssetRef::Id(id)) if id.is_empty() => None,
        Some(AssetRef::Id(id)) => Some(Asset {
            id,
            ..Default::default()
        }),
        Some(AssetRef::Embedded(asset)) => Some(asset),
        None => None,
    })
}

/// Editorial information shown on the catalog page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GspatialjpIndexItem {
    pub id: String,
    pub description: String,
    pub citygml_description: String,
    pub plateau_description: String,
    pub related_description: String,
    pub index_map: Option<Asset>,
    pub generics: Vec<GenericItem>,
}

impl GspatialjpIndexItem {
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            description: item.string("description").unwrap_or_default(),
            citygml_description: item.string("citygml_description").unwrap_or_default(),
            plateau_description: item.string("plateau_description").unwrap_or_default(),
            related_description: item.string("related_description").unwrap_or_default(),
            index_map: item.asset("index_map"),
            generics: item.list("generic"),
        }
    }
}

/// Merged artifacts and merge job statuses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GspatialjpDataItem {
    pub id: String,
    pub citygml: Option<Asset>,
    pub plateau: Option<Asset>,
    pub related: Option<Asset>,
    pub maxlod: Option<Asset>,
    pub index: String,
    pub index_url: String,
    pub merge_citygml_status: MergeStatus,
    pub merge_plateau_status: MergeStatus,
    pub merge_maxlod_status: MergeStatus,
}

impl GspatialjpDataItem {
    pub const CITYGML_STATUS: &'static str = "merge_citygml_status";
    pub const PLATEAU_STATUS: &'static str = "merge_plateau_status";
    pub const MAXLOD_STATUS: &'static str = "merge_maxlod_status";

    pub fn from_item(item: &Item) -> Self {
        let status = |key: &str| {
            item.string(key)
                .map(|s| MergeStatus::parse(&s))
                .unwrap_or_default()
        };

        Self {
            id: item.id.clone(),
            citygml: item.asset("citygml"),
            plateau: item.asset("plateau"),
            related: item.asset("related"),
            maxlod: item.asset("maxlod"),
            index: item.string("index").unwrap_or_default(),
            index_url: item.string("index_url").unwrap_or_default(),
            merge_citygml_status: status(Self::CITYGML_STATUS),
            merge_plateau_status: status(Self::PLATEAU_STATUS),
            merge_maxlod_status: status(Self::MAXLOD_STATUS),
        }
    }

    pub fn should_merge_citygml(&self) -> bool {
        self.merge_citygml_status != MergeStatus::Running
    }

    pub fn should_merge_plateau(&self) -> bool {
        self.merge_plateau_status != MergeStatus::Running
    }

    pub fn should_merge_maxlod(&self) -> bool {
        self.merge_maxlod_status != MergeStatus::Running
    }

    pub fn citygml_url(&self) -> &str {
        self.citygml.as_ref().map(|a| a.url.as_str()).unwrap_or_default()
    }

    pub fn plateau_url(&self) -> &str {
        self.plateau.as_ref().map(|a| a.url.as_str()).unwrap_or_default()
    }

    pub fn related_url(&self) -> &str {
        self.related.as_ref().map(|a| a.url.as_str()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// CKAN
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner_org: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub title: String,
    pub owner_org: String,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub name: String,
    pub url: String,
    pub description: String,
}
