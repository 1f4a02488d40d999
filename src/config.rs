use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
}

/// Display and naming preferences of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub allow_implicit_use_of_definitions: bool,
    pub do_not_name_dummy_vars_as_global_vars: bool,
    pub do_not_name_dummy_vars_as_dummy_vars_in_one_prop: bool,
    pub use_primes_for_variables_names: bool,
    pub use_seconds_for_variables_names: bool,
    pub use_indices_for_dummy_variables: bool,
    pub use_color_for_variables: bool,
    pub use_color_for_dummy_variables: bool,
    pub use_color_for_applied_properties: bool,
    pub use_bounded_quantification_notation: bool,
    pub select_language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_implicit_use_of_definitions: true,
            do_not_name_dummy_vars_as_global_vars: true,
            do_not_name_dummy_vars_as_dummy_vars_in_one_prop: true,
            use_primes_for_variables_names: true,
            use_seconds_for_variables_names: false,
            use_indices_for_dummy_variables: true,
            use_color_for_variables: true,
            use_color_for_dummy_variables: true,
            use_color_for_applied_properties: true,
            use_bounded_quantification_notation: true,
            select_language: Language::En,
        }
    }
}

impl Config {
    /// Reads a configuration; missing keys keep their default value.
    pub fn from_json(input: &str) -> anyhow::Result<Config> {
        serde_json::from_str(input).context("invalid configuration")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("cannot serialize configuration")
    }
}
