//! Declarative registry configuration.
//!
//! Groups and aliases are plain name-to-token mappings, so they deserialize
//! naturally from configuration files. [`PipelineConfig`] describes both
//! registries in token form; [`Pipeline::apply_config`] installs them.
//!
//! ```
//! use strata_pipeline::PipelineConfig;
//!
//! let config: PipelineConfig = serde_json::from_str(
//!     r#"{
//!         "groups": { "web": ["session", "csrf"] },
//!         "aliases": { "auth": "basic_auth", "site": ["session", "cache"] }
//!     }"#,
//! ).unwrap();
//!
//! assert_eq!(config.groups["web"], vec!["session", "csrf"]);
//! ```

use crate::handler::HandlerRef;
use crate::pipeline::Pipeline;
use crate::registry::AliasTarget;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A serializable description of the group and alias registries.
///
/// Entries reference middleware by token only; function, instance, and
/// constructor references are registered programmatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Group name to ordered token list.
    #[serde(default)]
    pub groups: IndexMap<String, Vec<String>>,
    /// Alias name to a single token or an ordered token list.
    #[serde(default)]
    pub aliases: IndexMap<String, AliasConfig>,
}

/// One alias entry: a single token or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasConfig {
    /// The alias stands for one token.
    One(String),
    /// The alias expands to an ordered token list.
    Many(Vec<String>),
}

impl<Rq, Rs> Pipeline<Rq, Rs> {
    /// Installs the registries described by a configuration.
    ///
    /// Replaces both registries, like calling
    /// [`set_groups`](Pipeline::set_groups) and
    /// [`set_aliases`](Pipeline::set_aliases) with token references.
    pub fn apply_config(&mut self, config: &PipelineConfig) -> &mut Self {
        let groups: HashMap<String, Vec<HandlerRef<Rq, Rs>>> = config
            .groups
            .iter()
            .map(|(name, members)| {
                let references = members
                    .iter()
                    .map(|token| HandlerRef::token(token.as_str()))
                    .collect();
                (name.clone(), references)
            })
            .collect();

        let aliases: HashMap<String, AliasTarget<Rq, Rs>> = config
            .aliases
            .iter()
            .map(|(name, entry)| {
                let target = match entry {
                    AliasConfig::One(token) => {
                        AliasTarget::Single(HandlerRef::token(token.as_str()))
                    }
                    AliasConfig::Many(tokens) => AliasTarget::List(
                        tokens
                            .iter()
                            .map(|token| HandlerRef::token(token.as_str()))
                            .collect(),
                    ),
                };
                (name.clone(), target)
            })
            .collect();

        self.set_groups(groups).set_aliases(aliases)
    }
}
