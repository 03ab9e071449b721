//! Settings for a whole preprocessing run, loadable from a JSON file.
use crate::error::{ConfigJsonSnafu, FileIoSnafu};
use crate::{EncoderConfig, ReservedTokens, Result, VocabConfig};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::Path;

/// Every field has a default, so a config file only needs to mention what it changes, e.g.
///
/// ```json
/// { "vocab": { "min-count": 20, "order": "first-seen" }, "encoder": { "max-len": 100 } }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub reserved: ReservedTokens,
    pub vocab: VocabConfig,
    pub encoder: EncoderConfig,
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reserved: ReservedTokens::default(),
            vocab: VocabConfig::default(),
            encoder: EncoderConfig::default(),
            batch_size: 32,
        }
    }
}

impl PipelineConfig {
    /// Read a config file, rejecting it if two reserved tokens share a literal
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let json = std::fs::read_to_string(path).context(FileIoSnafu { path })?;
        let config: Self = serde_json::from_str(&json).context(ConfigJsonSnafu { path })?;
        config.reserved.validate()?;

        Ok(config)
    }
}
