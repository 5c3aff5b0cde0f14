use std::path::Path;

use docmigrate_common::{Error, Result, SchemaDelta};
use tracing::info;

/// Reads declarative schema deltas from disk.
pub struct DeltaLoader;

impl DeltaLoader {
    /// Load and validate a delta from a `.toml`, `.yml` or `.yaml` file.
    pub fn load(path: &Path) -> Result<SchemaDelta> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read delta file {}: {e}", path.display()))
        })?;

        let delta = Self::parse(path, &contents)?;
        delta.validate()?;

        info!(
            "loaded delta for `{}` from {} ({} columns, {} indexes)",
            delta.table,
            path.display(),
            delta.columns.len(),
            delta.indexes.len()
        );
        Ok(delta)
    }

    fn parse(path: &Path, contents: &str) -> Result<SchemaDelta> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yml" | "yaml" => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            "toml" => {
                toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
            }
            other => Err(Error::Config(format!(
                "unsupported delta file extension: {other:?}"
            ))),
        }
    }
}
