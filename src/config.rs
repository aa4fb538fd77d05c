use crate::errors::Result;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Marker and modeline text used both to find the old block and to build the new one.
///
/// Every field has a default, so a YAML file only needs to name what it overrides:
///
/// ```yaml
/// driver_script: scripts/modelines.sh
/// vim: "// vim: shiftwidth=4 expandtab tabstop=4 cindent"
/// ```
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ModelineConfig {
    /// First line of the block; also what the scanner looks for.
    pub off_marker: String,
    /// Last line of the block.
    pub on_marker: String,
    /// Prefix of the notification line that must directly follow the off-marker.
    pub notification_prefix: String,
    /// Name of the script that runs this tool over a whole tree.
    pub driver_script: String,
    /// The vim modeline.
    pub vim: String,
    /// The kate modeline.
    pub kate: String,
    /// Lines starting with any of these are dropped wherever they appear.
    pub stray_prefixes: Vec<String>,
}

impl Default for ModelineConfig {
    fn default() -> Self {
        Self {
            off_marker: "// clang-format off".to_string(),
            on_marker: "// clang-format on".to_string(),
            notification_prefix: "// modelines:".to_string(),
            driver_script: "tools/update_modelines.sh".to_string(),
            vim: "// vim: shiftwidth=2 expandtab tabstop=2 cindent".to_string(),
            kate: "// kate: tab-indents: off; indent-width 2; replace-tabs on; indent-mode cstyle; remove-trailing-spaces modified;".to_string(),
            stray_prefixes: vec![
                "// modelines".to_string(),
                "// vim".to_string(),
                "// kate".to_string(),
            ],
        }
    }
}

impl ModelineConfig {
    /// The full notification line, without terminator.
    pub fn notification_line(&self) -> String {
        format!(
            "{} These editor modelines have been set for all relevant files by {}",
            self.notification_prefix, self.driver_script
        )
    }

    /// The block appended to every file: five lines and a trailing blank line.
    pub fn block(&self) -> String {
        let notification = self.notification_line();
        let mut block = String::new();
        for line in [
            self.off_marker.as_str(),
            notification.as_str(),
            self.vim.as_str(),
            self.kate.as_str(),
            self.on_marker.as_str(),
            "",
        ] {
            block.push_str(line);
            block.push('\n');
        }
        block
    }

    /// Rejects configurations the scanner cannot work with.
    ///
    /// An empty marker or prefix would match every line.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("off_marker", &self.off_marker),
            ("on_marker", &self.on_marker),
            ("notification_prefix", &self.notification_prefix),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(format!("'{name}' must not be empty").into());
            }
        }
        if self.stray_prefixes.iter().any(|p| p.is_empty()) {
            return Err("'stray_prefixes' must not contain empty entries".into());
        }
        for line in [&self.off_marker, &self.on_marker, &self.vim, &self.kate] {
            if line.contains('\n') {
                return Err(format!("modeline text must be a single line: {line:?}").into());
            }
        }
        Ok(())
    }
}

/// A utility for locating and loading modeline configuration files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds the configuration file by searching in a prioritized list of locations.
    ///
    /// The search order is:
    /// 1. The path as given (absolute, or relative to the current directory).
    /// 2. A path relative to `target_dir`, the directory of the file being rewritten.
    /// 3. Inside `<config dir>/update-modelines`, e.g. `~/.config/update-modelines`.
    pub fn find_config(config_path: &Path, target_dir: &Path) -> Result<PathBuf> {
        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        let mut tried_locations = vec![config_path.display().to_string()];

        if config_path.is_relative() {
            let in_target_dir = target_dir.join(config_path);
            if in_target_dir.exists() {
                return Ok(in_target_dir);
            }
            tried_locations.push(in_target_dir.display().to_string());

            if let Some(config_dir) = dirs::config_dir() {
                let user_config = config_dir.join("update-modelines").join(config_path);
                if user_config.exists() {
                    return Ok(user_config);
                }
                tried_locations.push(user_config.display().to_string());
            }
        }

        Err(format!(
            "Config file '{}' not found. Searched in:\n  - {}",
            config_path.display(),
            tried_locations.join("\n  - ")
        )
        .into())
    }

    /// Loads and validates a `ModelineConfig` from a YAML file.
    pub fn load_modeline_config(path: &Path) -> Result<ModelineConfig> {
        let file = File::open(path)?;
        let config: ModelineConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }
}
