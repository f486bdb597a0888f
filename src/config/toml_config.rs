use crate::utils::error::{PlateauError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub cms: CmsConfig,
    pub ckan: Option<CkanConfig>,
    #[serde(default)]
    pub prepare: PrepareSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CkanConfig {
    pub base_url: String,
    pub token: String,
    pub org: String,
    /// Visibility of newly created packages.
    pub private: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepareSection {
    pub tmp_dir_base: Option<String>,
    #[serde(default)]
    pub feature_types: Vec<String>,
    pub worker_command: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PlateauError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are kept as is.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn ckan(&self) -> Result<&CkanConfig> {
        validation::validate_required_field("ckan", &self.ckan)
    }

    pub fn tmp_dir_base(&self) -> &str {
        self.prepare
            .tmp_dir_base
            .as_deref()
            .unwrap_or(crate::core::prepare::DEFAULT_TMP_DIR_BASE)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("cms.base_url", &self.cms.base_url)?;
        validation::validate_non_empty_string("cms.token", &self.cms.token)?;

        if let Some(ckan) = &self.ckan {
            validation::validate_url("ckan.base_url", &ckan.base_url)?;
            validation::validate_non_empty_string("ckan.token", &ckan.token)?;
            validation::validate_non_empty_string("ckan.org", &ckan.org)?;
        }

        validation::validate_dir_path("prepare.tmp_dir_base", self.tmp_dir_base())?;

        if let Some(command) = &self.prepare.worker_command {
            validation::validate_non_empty_string("prepare.worker_command", command)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[cms]
base_url = "https://cms.example.com"
token = "cms-token"

[ckan]
base_url = "https://catalog.example.com/"
token = "ckan-token"
org = "plateau-org"
private = true

[prepare]
tmp_dir_base = "/tmp/plateau"
feature_types = ["bldg", "tran"]
worker_command = "plateau-worker --quiet"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.cms.token, "cms-token");
        assert_eq!(config.ckan().unwrap().org, "plateau-org");
        assert_eq!(config.ckan().unwrap().private, Some(true));
        assert_eq!(config.tmp_dir_base(), "/tmp/plateau");
        assert_eq!(config.prepare.feature_types, vec!["bldg", "tran"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
[cms]
base_url = "https://cms.example.com"
token = "t"
"#,
        )
        .unwrap();

        assert!(config.ckan().is_err());
        assert_eq!(config.tmp_dir_base(), "plateau-gspatial-tmp");
        assert!(config.prepare.feature_types.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PLATEAU_TEST_CMS_TOKEN", "from-env");

        let config = TomlConfig::from_toml_str(
            r#"
[cms]
base_url = "https://cms.example.com"
token = "${PLATEAU_TEST_CMS_TOKEN}"

[prepare]
worker_command = "${PLATEAU_TEST_UNSET_VARIABLE}"
"#,
        )
        .unwrap();

        assert_eq!(config.cms.token, "from-env");
        assert_eq!(
            config.prepare.worker_command.as_deref(),
            Some("${PLATEAU_TEST_UNSET_VARIABLE}")
        );

        std::env::remove_var("PLATEAU_TEST_CMS_TOKEN");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[cms]
base_url = "invalid-url"
token = "t"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            r#"
[cms]
base_url = "https://cms.example.com"
token = "t"

[ckan]
base_url = "https://catalog.example.com"
token = "t"
org = " "
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[cms").unwrap_err();
        assert!(matches!(err, PlateauError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[cms]\nbase_url = \"https://cms.example.com\"\ntoken = \"t\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.cms.base_url, "https://cms.example.com");
    }
}
