use crate::domain::model::{
    Asset, CityItem, GenericItem, GspatialjpDataItem, GspatialjpIndexItem, NewPackage,
};
use crate::domain::ports::Cms;
use crate::utils::error::{PlateauError, Result, ResultExt};
use crate::utils::format::replace_size;

/// Artifacts and metadata gathered from the CMS for one publication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seed {
    /// Major spec version, embedded in every resource name.
    pub v: u32,
    pub description: String,
    pub index: String,
    pub index_url: String,
    pub index_map_url: String,
    pub citygml: String,
    pub citygml_description: String,
    pub plateau: String,
    pub plateau_description: String,
    pub related: String,
    pub related_description: String,
    pub generics: Vec<GenericItem>,
    pub gspatialjp_data_item_id: String,
}

impl Seed {
    pub fn from_items(
        city: &CityItem,
        index: &GspatialjpIndexItem,
        data: &GspatialjpDataItem,
    ) -> Self {
        Self {
            v: city.spec_version_major_int(),
            description: index.description.clone(),
            index: data.index.clone(),
            index_url: data.index_url.clone(),
            index_map_url: index
                .index_map
                .as_ref()
                .map(|a| a.url.clone())
                .unwrap_or_default(),
            citygml: data.citygml_url().to_string(),
            citygml_description: describe(&index.citygml_description, data.citygml.as_ref()),
            plateau: data.plateau_url().to_string(),
            plateau_description: describe(&index.plateau_description, data.plateau.as_ref()),
            related: data.related_url().to_string(),
            related_description: describe(&index.related_description, data.related.as_ref()),
            generics: index.generics.clone(),
            gspatialjp_data_item_id: data.id.clone(),
        }
    }

    pub fn valid(&self) -> bool {
        let has_generic = self
            .generics
            .iter()
            .any(|g| g.asset.as_ref().is_some_and(|a| !a.url.is_empty()));

        self.v > 0
            && (!self.index.is_empty()
                || !self.index_map_url.is_empty()
                || !self.citygml.is_empty()
                || !self.plateau.is_empty()
                || !self.related.is_empty()
                || has_generic)
    }
}

fn describe(template: &str, asset: Option<&Asset>) -> String {
    match asset {
        Some(asset) if asset.total_size > 0 => replace_size(template, asset.total_size),
        _ => template.to_string(),
    }
}

pub async fn get_seed<C: Cms>(cms: &C, city: &CityItem) -> Result<Seed> {
    if city.geospatialjp_data.is_empty() {
        return Err(PlateauError::invalid_item(format!(
            "city item {} has no geospatialjp data item",
            city.id
        )));
    }

    let data_raw = cms
        .get_item(&city.geospatialjp_data, true)
        .await
        .context("failed to get geospatialjp data item")?;
    let data = GspatialjpDataItem::from_item(&data_raw);

    let index = if city.geospatialjp_index.is_empty() {
        GspatialjpIndexItem::default()
    } else {
        let index_raw = cms
            .get_item(&city.geospatialjp_index, true)
            .await
            .context("failed to get geospatialjp index item")?;
        GspatialjpIndexItem::from_item(&index_raw)
    };

    Ok(Seed::from_items(city, &index, &data))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageSeed {
    pub name: String,
    pub title: String,
    pub owner_org: String,
    pub notes: String,
    pub year: u32,
    pub version: u32,
}

impl PackageSeed {
    pub fn from_city(city: &CityItem, seed: &Seed, owner_org: &str) -> Self {
        let year = city.year_int();
        Self {
            name: format!("plateau-{}-{}-{}", city.city_code, city.city_name_en, year)
                .to_lowercase(),
            title: format!(
                "3D都市モデル（Project PLATEAU）{}（{}年度）",
                city.city_name, year
            ),
            owner_org: owner_org.to_string(),
            notes: seed.description.clone(),
            year,
            version: seed.v,
        }
    }

    /// Package fields for `package_create`; `private` is only sent on create.
    pub fn to_new_package(&self, private: Option<bool>) -> NewPackage {
        NewPackage {
            name: self.name.clone(),
            title: self.title.clone(),
            owner_org: self.owner_org.clone(),
            notes: self.notes.clone(),
            private,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city() -> CityItem {
        CityItem {
            id: "city1".to_string(),
            city_name: "千代田区".to_string(),
            city_name_en: "Chiyoda-ku".to_string(),
            city_code: "13101".to_string(),
            year: "2023".to_string(),
            spec: "第3.4版".to_string(),
            geospatialjp_data: "data1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_seed_from_items_replaces_sizes() {
        let index = GspatialjpIndexItem {
            citygml_description: "CityGML (${{ SIZE }})".to_string(),
            plateau_description: "3D Tiles (${{ SIZE }})".to_string(),
            ..Default::default()
        };
        let data = GspatialjpDataItem {
            id: "data1".to_string(),
            citygml: Some(Asset {
                id: "a".to_string(),
                url: "https://example.com/citygml.zip".to_string(),
                total_size: 1500,
            }),
            plateau: Some(Asset {
                id: "b".to_string(),
                url: "https://example.com/plateau.zip".to_string(),
                total_size: 0,
            }),
            ..Default::default()
        };

        let seed = Seed::from_items(&city(), &index, &data);
        assert_eq!(seed.v, 3);
        assert_eq!(seed.citygml_description, "CityGML (1.5 kB)");
        assert_eq!(seed.plateau_description, "3D Tiles (${{ SIZE }})");
        assert_eq!(seed.gspatialjp_data_item_id, "data1");
        assert!(seed.valid());
    }

    #[test]
    fn test_seed_validity() {
        assert!(!Seed::default().valid());

        let only_version = Seed {
            v: 3,
            ..Default::default()
        };
        assert!(!only_version.valid());

        let no_version = Seed {
            citygml: "https://example.com/citygml.zip".to_string(),
            ..Default::default()
        };
        assert!(!no_version.valid());

        let generic_without_asset = Seed {
            v: 3,
            generics: vec![GenericItem {
                name: "x".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(!generic_without_asset.valid());
    }

    #[test]
    fn test_package_seed_from_city() {
        let seed = Seed {
            v: 3,
            description: "notes".to_string(),
            ..Default::default()
        };
        let pkg = PackageSeed::from_city(&city(), &seed, "plateau-org");

        assert_eq!(pkg.name, "plateau-13101-chiyoda-ku-2023");
        assert_eq!(pkg.title, "3D都市モデル（Project PLATEAU）千代田区（2023年度）");
        assert_eq!(pkg.owner_org, "plateau-org");
        assert_eq!(pkg.notes, "notes");
        assert_eq!(pkg.to_new_package(Some(true)).private, Some(true));
        assert_eq!(pkg.to_new_package(None).private, None);
    }
}
