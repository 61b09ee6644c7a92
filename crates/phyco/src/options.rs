//! Engine options

/// Options carried by a [`TableStore`](crate::TableStore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Cell text written for a NaN formula result (default: `"NaN"`)
    pub nan_text: String,
    /// Trim surrounding whitespace from plain cell values before commit
    pub trim_input: bool,
    /// Seed a first row when the first column is added to an empty table
    pub seed_first_row: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            nan_text: "NaN".to_string(),
            trim_input: true,
            seed_first_row: true,
        }
    }
}

impl EngineOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text used for NaN results
    pub fn with_nan_text<S: Into<String>>(mut self, nan_text: S) -> Self {
        self.nan_text = nan_text.into();
        self
    }

    /// Enable or disable input trimming
    pub fn with_trim_input(mut self, trim_input: bool) -> Self {
        self.trim_input = trim_input;
        self
    }

    /// Enable or disable first-row seeding
    pub fn with_seed_first_row(mut self, seed_first_row: bool) -> Self {
        self.seed_first_row = seed_first_row;
        self
    }
}
