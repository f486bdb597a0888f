use crate::utils::error::{PlateauError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PlateauError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(PlateauError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(PlateauError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// A directory path that may not exist yet but must not be a regular file.
pub fn validate_dir_path(field_name: &str, path: &str) -> Result<()> {
    let reason = if path.trim().is_empty() {
        "Path cannot be empty"
    } else if Path::new(path).is_file() {
        "Path points to a file, a directory is required"
    } else {
        return Ok(());
    };

    Err(PlateauError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: path.to_string(),
        reason: reason.to_string(),
    })
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| PlateauError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlateauError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("cms.base_url", "https://cms.example.com").is_ok());
        assert!(validate_url("cms.base_url", "http://localhost:8080").is_ok());
        assert!(validate_url("cms.base_url", "").is_err());
        assert!(validate_url("cms.base_url", "invalid-url").is_err());
        assert!(validate_url("cms.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let token = Some("secret".to_string());
        assert_eq!(validate_required_field("cms.token", &token).unwrap(), "secret");

        let missing: Option<String> = None;
        let err = validate_required_field("ckan.token", &missing).unwrap_err();
        assert!(matches!(err, PlateauError::MissingConfigError { field } if field == "ckan.token"));
    }

    #[test]
    fn test_validate_dir_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();

        assert!(validate_dir_path("prepare.tmp_dir_base", dir.path().to_str().unwrap()).is_ok());
        assert!(validate_dir_path("prepare.tmp_dir_base", "not-created-yet/tmp").is_ok());
        assert!(validate_dir_path("prepare.tmp_dir_base", " ").is_err());

        let err = validate_dir_path("prepare.tmp_dir_base", file.path().to_str().unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("a directory is required"));
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("ckan.org", "plateau").is_ok());
        assert!(validate_non_empty_string("ckan.org", "   ").is_err());
    }
}
