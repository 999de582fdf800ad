use std::path::PathBuf;

use crate::error::Error;
use crate::fs::FileSystem;

/// Name of the project config file at the root.
pub const CONFIG_FILE: &str = ".mdref.toml";

/// Default asset directory convention.
const DEFAULT_ASSET_DIR: &str = "assets";

/// Project configuration loaded from `.mdref.toml`, then adjusted by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory name under which embeds may be referenced by file name alone.
    pub asset_dir: String,
    /// Run-time ignore patterns, highest precedence.
    pub ignore: Vec<String>,
    /// When `true`, only embeds mark an image as used.
    pub strict_image_refs: bool,
}

/// Raw TOML structure for `.mdref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct MdrefTomlConfig {
    /// See `Config::asset_dir`.
    #[serde(default)]
    asset_dir: Option<String>,
    /// See `Config::ignore`.
    #[serde(default)]
    ignore: Vec<String>,
    /// See `Config::strict_image_refs`.
    #[serde(default)]
    strict_image_refs: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            asset_dir: DEFAULT_ASSET_DIR.to_string(),
            ignore: Vec::new(),
            strict_image_refs: true,
        };
    }
}

impl Config {
    /// Load `.mdref.toml` from the root. Returns defaults if the file doesn't
    /// exist. A file that exists but is malformed is an error, never a silent
    /// fallback to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailed` if the file cannot be read,
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` if a value is out of range.
    pub fn load(fs: &dyn FileSystem) -> Result<Self, Error> {
        if !fs.file_exists(CONFIG_FILE) {
            return Ok(Self::default());
        }

        let content = fs.read_file(CONFIG_FILE)?;
        let raw: MdrefTomlConfig = toml::from_str(&content)?;
        let defaults = Self::default();

        let asset_dir = raw.asset_dir.unwrap_or(defaults.asset_dir);
        if asset_dir.is_empty() || asset_dir.contains(['/', '\\']) {
            return Err(Error::ConfigInvalid {
                path: PathBuf::from(CONFIG_FILE),
                reason: format!("asset_dir must be a single directory name, got `{asset_dir}`"),
            });
        }

        return Ok(Self {
            asset_dir,
            ignore: raw.ignore,
            strict_image_refs: raw.strict_image_refs.unwrap_or(defaults.strict_image_refs),
        });
    }

    /// Apply command-line overrides: extra ignore patterns are appended after
    /// the config's own, and `loose_images` turns off strict image usage.
    #[must_use]
    pub fn with_overrides(mut self, extra_ignore: &[String], loose_images: bool) -> Self {
        self.ignore.extend(extra_ignore.iter().cloned());
        if loose_images {
            self.strict_image_refs = false;
        }
        return self;
    }
}
