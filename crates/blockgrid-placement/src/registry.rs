//! Strategy registry: maps configured names to strategy objects.
//!
//! The catalog is filled once at startup from an explicit list; lookups
//! are exact-name matches. A resolution either returns every requested
//! strategy or fails naming all the names it could not find.

use std::sync::Arc;

use tracing::debug;

use blockgrid_core::StrategyNames;

use crate::error::{PlacementError, PlacementResult, StrategyKind};

/// Anything that can be looked up by name in a registry.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;
}

/// A fixed catalog of named strategies.
pub struct StrategyRegistry<S: ?Sized> {
    kind: StrategyKind,
    entries: Vec<Arc<S>>,
}

impl<S: Strategy + ?Sized> StrategyRegistry<S> {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Add a strategy. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, strategy: Arc<S>) {
        self.entries.retain(|e| e.name() != strategy.name());
        self.entries.push(strategy);
    }

    pub fn with(mut self, strategy: Arc<S>) -> Self {
        self.register(strategy);
        self
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<Arc<S>> {
        self.entries.iter().find(|e| e.name() == name).cloned()
    }

    /// Names of every registered strategy, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    /// Resolve `names` in order.
    pub fn resolve<N: AsRef<str>>(&self, names: &[N]) -> PlacementResult<Vec<Arc<S>>> {
        let mut resolved = Vec::with_capacity(names.len());
        let mut missing = Vec::new();

        for name in names {
            match self.get(name.as_ref()) {
                Some(strategy) => resolved.push(strategy),
                None => missing.push(name.as_ref().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(PlacementError::UnknownStrategies {
                kind: self.kind,
                names: missing,
            });
        }

        debug!(kind = %self.kind, count = resolved.len(), "strategies resolved");
        Ok(resolved)
    }

    /// Resolve the request's names, or `defaults` when it names none.
    pub fn resolve_or_default(
        &self,
        requested: Option<&StrategyNames>,
        defaults: &StrategyNames,
    ) -> PlacementResult<Vec<Arc<S>>> {
        let names = requested.unwrap_or(defaults).to_vec();
        self.resolve(&names)
    }
}
