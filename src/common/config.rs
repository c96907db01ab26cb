//! Reusable documented configuration pattern
//!
//! Config structs derive `Serialize`/`Deserialize` with `#[serde(default)]`,
//! so every field is always populated. The `documented_config!` macro
//! implements [`DocumentedConfig`], which writes each field on its own line
//! followed by a short description comment:
//!
//! ```ignore
//! documented_config!(NarrationConfig {
//!     fields: [
//!         extra_padding_seconds, "Silence appended after each slide's audio",
//!         minimum_duration_seconds, "Duration of slides without audio",
//!     ],
//!     config_path: paths::narration_config_path(),
//! });
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata about a configuration field
#[derive(Debug, Clone)]
pub struct ConfigFieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

/// Trait for configs with documented defaults
///
/// This trait is automatically implemented by the `documented_config!` macro.
pub trait DocumentedConfig: Sized + Default {
    /// Get metadata for all configuration fields
    fn field_metadata() -> Vec<ConfigFieldMeta>;

    /// Get the TOML-serialized value for a specific field
    fn get_field_value(&self, field_name: &str) -> String;

    /// Get path where this config should be stored
    fn config_path() -> Result<PathBuf>;

    /// Render the config as TOML with one description comment per field
    fn to_documented_toml(&self) -> String {
        let mut output = String::new();
        for field in Self::field_metadata() {
            let value = self.get_field_value(field.name);
            output.push_str(&format!(
                "{} = {}  # {}\n",
                field.name, value, field.description
            ));
        }
        output
    }

    /// Save config with inline documentation
    fn save_with_documentation(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        fs::write(path, self.to_documented_toml())
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Load config from `path`, writing a documented default file when missing
    fn load_from_path_documented(path: &Path) -> Result<Self>
    where
        for<'de> Self: serde::de::Deserialize<'de>,
    {
        if !path.exists() {
            let config = Self::default();
            config.save_with_documentation(path)?;
            return Ok(config);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Macro to generate the DocumentedConfig trait implementation
#[macro_export]
macro_rules! documented_config {
    (
        $config_name:ident {
            fields: [
                $($field:ident, $desc:expr),* $(,)?
            ],
            config_path: $path:expr $(,)?
        }
    ) => {
        impl $crate::common::config::DocumentedConfig for $config_name {
            fn field_metadata() -> Vec<$crate::common::config::ConfigFieldMeta> {
                vec![
                    $(
                        $crate::common::config::ConfigFieldMeta {
                            name: stringify!($field),
                            description: $desc,
                        },
                    )*
                ]
            }

            fn get_field_value(&self, field_name: &str) -> String {
                match field_name {
                    $(
                        stringify!($field) => {
                            toml::Value::try_from(&self.$field)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| format!("{:?}", self.$field))
                        }
                    )*
                    _ => String::new(),
                }
            }

            fn config_path() -> anyhow::Result<std::path::PathBuf> {
                $path
            }
        }
    };
}
