// Registry of func map makers, materialized once per render call

use std::sync::Arc;

use super::set::FunctionValueSet;
use crate::context::RequestContext;
use crate::error::{MakerError, RenderError};

/// Contributes bindings to a render call's function values.
pub trait FuncMapMaker: Send + Sync {
    fn make(&self, funcs: &mut FunctionValueSet, ctx: &RequestContext) -> Result<(), MakerError>;
}

impl<F> FuncMapMaker for F
where
    F: Fn(&mut FunctionValueSet, &RequestContext) -> Result<(), MakerError> + Send + Sync,
{
    fn make(&self, funcs: &mut FunctionValueSet, ctx: &RequestContext) -> Result<(), MakerError> {
        self(funcs, ctx)
    }
}

/// Makers keyed by name, kept in first-registration order.
#[derive(Clone, Default)]
pub struct FuncMapRegistry {
    makers: Vec<(String, Arc<dyn FuncMapMaker>)>,
}

impl FuncMapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a maker, or replace the one already under `name` in its slot.
    pub fn register(&mut self, name: impl Into<String>, maker: Arc<dyn FuncMapMaker>) {
        let name = name.into();
        match self.makers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = maker,
            None => self.makers.push((name, maker)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.makers.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.makers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }

    /// Run every maker in order against one growing set. The first failure
    /// aborts and nothing is returned.
    pub fn materialize(&self, ctx: &RequestContext) -> Result<FunctionValueSet, RenderError> {
        let mut funcs = FunctionValueSet::new();
        self.materialize_into(&mut funcs, ctx)?;
        Ok(funcs)
    }

    /// Like `materialize`, on top of bindings already in `funcs`, so a
    /// maker's `set_default` leaves them alone while its `set` overrides them.
    pub fn materialize_into(
        &self,
        funcs: &mut FunctionValueSet,
        ctx: &RequestContext,
    ) -> Result<(), RenderError> {
        for (name, maker) in &self.makers {
            maker.make(funcs, ctx).map_err(|e| RenderError::Maker {
                maker: name.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}
