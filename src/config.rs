// Configuration file handling.
//
// The file is a JSON object. Lines whose first non-blank character is `#`
// are comments and are dropped before parsing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.dropbox.com";
pub const DEFAULT_CONTENT_URL: &str = "https://api-content.dropbox.com";

const CONFIG_FILE_NAME: &str = ".dbox.conf";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

/// `$HOME/.dbox.conf`, or `./.dbox.conf` when there is no home directory.
pub fn default_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(CONFIG_FILE_NAME)
}

impl Config {
    /// Load the config at `path`. A missing file yields an empty config so
    /// that the setup wizard can run.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, starting empty", path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("opening config file {}", path.display()))
            }
        };
        Self::parse(&data).with_context(|| format!("reading config file {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let json: String = data
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");
        if json.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_json::from_str(&json).context("config file has illegal syntax")
    }

    /// Write the config as JSON, readable only by the owner on Unix.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("serializing config")?;
        std::fs::write(path, data)
            .with_context(|| format!("writing config file {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("restricting permissions on {}", path.display()))?;
        }
        Ok(())
    }

    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Metadata/file-operation endpoint: `DBOX_API_URL`, then the config,
    /// then the default.
    pub fn api_url(&self) -> String {
        resolve_url("DBOX_API_URL", self.api_url.as_deref(), DEFAULT_API_URL)
    }

    /// File transfer endpoint: `DBOX_CONTENT_URL`, then the config, then
    /// the default.
    pub fn content_url(&self) -> String {
        resolve_url(
            "DBOX_CONTENT_URL",
            self.content_url.as_deref(),
            DEFAULT_CONTENT_URL,
        )
    }
}

fn resolve_url(var: &str, configured: Option<&str>, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_lines_are_ignored() {
        let cfg = Config::parse(
            "# dbox configuration\n{\n  # token below\n  \"access_token\": \"abc\"\n}\n",
        )
        .unwrap();
        assert_eq!(cfg.access_token, "abc");
        assert!(cfg.api_url.is_none());
    }

    #[test]
    fn blank_file_is_empty_config() {
        let cfg = Config::parse("# nothing yet\n\n").unwrap();
        assert!(!cfg.has_token());
    }

    #[test]
    fn illegal_syntax_is_reported() {
        let err = Config::parse("{ access_token: }").unwrap_err();
        assert!(err.to_string().contains("illegal syntax"));
    }

    #[test]
    fn configured_url_loses_trailing_slash() {
        assert_eq!(
            resolve_url("DBOX_TEST_UNSET_VAR", Some("http://localhost:9000/"), DEFAULT_API_URL),
            "http://localhost:9000"
        );
        assert_eq!(
            resolve_url("DBOX_TEST_UNSET_VAR", None, DEFAULT_API_URL),
            DEFAULT_API_URL
        );
    }
}
