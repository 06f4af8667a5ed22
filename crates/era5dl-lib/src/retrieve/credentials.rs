use crate::config::ApiConfig;
use crate::error::Era5DlError;
use config::{Config as ConfigBuilder, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://cds.climate.copernicus.eu/api";

const URL_ENV: &str = "CDSAPI_URL";
const KEY_ENV: &str = "CDSAPI_KEY";
const RC_ENV: &str = "CDSAPI_RC";
const RC_FILE_NAME: &str = ".cdsapirc";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Contents of a `.cdsapirc` file: `url: ...` and `key: ...` lines.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RcFile {
    pub url: Option<String>,
    pub key: Option<String>,
}

pub fn read_rc_file(path: &Path) -> Result<RcFile, Era5DlError> {
    let rc = ConfigBuilder::builder()
        .add_source(config::File::from(path).format(FileFormat::Yaml))
        .build()?;
    Ok(rc.try_deserialize()?)
}

fn rc_file_path() -> Option<PathBuf> {
    std::env::var_os(RC_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(RC_FILE_NAME)))
}

/// Resolves API credentials.
///
/// Explicit configuration wins. Otherwise `CDSAPI_URL`/`CDSAPI_KEY` are used,
/// with anything missing filled in from the rc file (`CDSAPI_RC` or `~/.cdsapirc`).
/// The url falls back to [`DEFAULT_API_URL`]; a missing key is an error.
pub fn resolve_credentials(api: Option<&ApiConfig>) -> Result<Credentials, Era5DlError> {
    if let Some(api) = api {
        return Ok(Credentials {
            url: api.url.clone(),
            key: api.key.clone(),
        });
    }

    let mut url = std::env::var(URL_ENV).ok();
    let mut key = std::env::var(KEY_ENV).ok();

    if url.is_none() || key.is_none() {
        if let Some(path) = rc_file_path().filter(|path| path.is_file()) {
            tracing::debug!("Reading API credentials from {}", path.display());
            let rc = read_rc_file(&path)?;
            url = url.or(rc.url);
            key = key.or(rc.key);
        }
    }

    let key = key.ok_or_else(|| Era5DlError::Credentials {
        details: format!(
            "Missing API key. Set {KEY_ENV}, add an api section to the config, or create ~/{RC_FILE_NAME}"
        ),
    })?;

    Ok(Credentials {
        url: url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        key,
    })
}
