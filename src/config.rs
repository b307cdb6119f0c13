use serde::{Deserialize, Serialize};

/// Options for reading DEX files and packages.
///
/// Every option is off by default, and missing keys deserialize to their
/// defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Walk every class' annotations and exclude the strings they use from
    /// constant-string output. Roughly doubles DEX parse time.
    pub sanitize_annotations: bool,
    /// Abort a package load on the first DEX entry that fails to parse,
    /// instead of skipping it.
    pub fail_on_invalid_dex: bool,
    /// Abort a package load on the first resource table that fails to parse,
    /// instead of skipping it.
    pub fail_on_invalid_resource: bool,
}

impl ParseConfig {
    pub fn with_sanitize_annotations(mut self, sanitize: bool) -> Self {
        self.sanitize_annotations = sanitize;
        self
    }

    pub fn with_fail_on_invalid_dex(mut self, fail: bool) -> Self {
        self.fail_on_invalid_dex = fail;
        self
    }

    pub fn with_fail_on_invalid_resource(mut self, fail: bool) -> Self {
        self.fail_on_invalid_resource = fail;
        self
    }
}
