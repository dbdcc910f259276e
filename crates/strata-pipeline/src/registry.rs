//! Group and alias registries, and stack flattening.
//!
//! A pipeline holds two name mappings: groups (name to an ordered list of
//! handler references) and aliases (name to a single reference or a list).
//! Before a chain executes, the raw stack is flattened: group tokens and
//! argument-less alias tokens are recursively substituted by their contents,
//! depth-first and order-preserving. Tokens that carry arguments and name an
//! alias are kept verbatim - they are resolved lazily at invocation time so
//! their arguments reach the aliased handler.

use crate::handler::HandlerRef;
use std::collections::HashMap;
use strata_core::{PipelineError, PipelineResult, Token};

/// The target of an alias registration.
pub enum AliasTarget<Rq, Rs> {
    /// One handler reference.
    Single(HandlerRef<Rq, Rs>),
    /// An ordered list, expanded during flattening like a group.
    List(Vec<HandlerRef<Rq, Rs>>),
}

impl<Rq, Rs> AliasTarget<Rq, Rs> {
    /// The target as a slice of references.
    #[must_use]
    pub fn members(&self) -> &[HandlerRef<Rq, Rs>] {
        match self {
            Self::Single(reference) => std::slice::from_ref(reference),
            Self::List(references) => references,
        }
    }
}

impl<Rq, Rs> Clone for AliasTarget<Rq, Rs> {
    fn clone(&self) -> Self {
        match self {
            Self::Single(reference) => Self::Single(reference.clone()),
            Self::List(references) => Self::List(references.clone()),
        }
    }
}

impl<Rq, Rs> std::fmt::Debug for AliasTarget<Rq, Rs> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(reference) => f.debug_tuple("Single").field(reference).finish(),
            Self::List(references) => f.debug_tuple("List").field(references).finish(),
        }
    }
}

impl<Rq, Rs> From<HandlerRef<Rq, Rs>> for AliasTarget<Rq, Rs> {
    fn from(reference: HandlerRef<Rq, Rs>) -> Self {
        Self::Single(reference)
    }
}

impl<Rq, Rs> From<Vec<HandlerRef<Rq, Rs>>> for AliasTarget<Rq, Rs> {
    fn from(references: Vec<HandlerRef<Rq, Rs>>) -> Self {
        Self::List(references)
    }
}

impl<Rq, Rs> From<&str> for AliasTarget<Rq, Rs> {
    fn from(token: &str) -> Self {
        Self::Single(HandlerRef::token(token))
    }
}

/// The two name registries of a pipeline.
pub struct Registry<Rq, Rs> {
    groups: HashMap<String, Vec<HandlerRef<Rq, Rs>>>,
    aliases: HashMap<String, AliasTarget<Rq, Rs>>,
}

impl<Rq, Rs> Default for Registry<Rq, Rs> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            aliases: HashMap::new(),
        }
    }
}

impl<Rq, Rs> Registry<Rq, Rs> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the group mapping, replacing any previous one.
    pub fn set_groups(&mut self, groups: HashMap<String, Vec<HandlerRef<Rq, Rs>>>) {
        self.groups = groups;
    }

    /// Installs the alias mapping, replacing any previous one.
    pub fn set_aliases(&mut self, aliases: HashMap<String, AliasTarget<Rq, Rs>>) {
        self.aliases = aliases;
    }

    /// Looks up an alias target by name.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&AliasTarget<Rq, Rs>> {
        self.aliases.get(name)
    }

    /// Looks up a group's members by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[HandlerRef<Rq, Rs>]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Flattens a raw stack against the registries.
    ///
    /// Group tokens and argument-less alias tokens are recursively replaced
    /// by their contents in place, depth-first. Argument-carrying alias
    /// tokens and everything else pass through unchanged.
    ///
    /// # Errors
    ///
    /// [`PipelineError::CircularReference`] when a group or alias reaches
    /// itself, directly or transitively, on the active expansion path. The
    /// same name appearing twice at sibling positions is legal.
    pub(crate) fn flatten(
        &self,
        stack: &[HandlerRef<Rq, Rs>],
    ) -> PipelineResult<Vec<HandlerRef<Rq, Rs>>> {
        let mut flattened = Vec::with_capacity(stack.len());
        let mut path = Vec::new();
        self.expand(stack, &mut flattened, &mut path)?;
        Ok(flattened)
    }

    fn expand(
        &self,
        references: &[HandlerRef<Rq, Rs>],
        out: &mut Vec<HandlerRef<Rq, Rs>>,
        path: &mut Vec<String>,
    ) -> PipelineResult<()> {
        for reference in references {
            if let HandlerRef::Token(raw) = reference {
                let token = Token::parse(raw);
                if !token.has_args() {
                    if let Some(members) = self.groups.get(token.name) {
                        enter(path, token.name)?;
                        self.expand(members, out, path)?;
                        path.pop();
                        continue;
                    }
                    if let Some(target) = self.aliases.get(token.name) {
                        enter(path, token.name)?;
                        self.expand(target.members(), out, path)?;
                        path.pop();
                        continue;
                    }
                }
            }
            out.push(reference.clone());
        }
        Ok(())
    }
}

// Groups and aliases share one namespace on the guard path.
fn enter(path: &mut Vec<String>, name: &str) -> PipelineResult<()> {
    if path.iter().any(|seen| seen == name) {
        return Err(PipelineError::circular_reference(name));
    }
    path.push(name.to_string());
    Ok(())
}
