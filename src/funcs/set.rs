// Ordered set of named function values

use std::collections::HashMap;

use super::value::FunctionValue;

/// Named helper bindings in insertion order. Names are unique; replacing a
/// binding keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct FunctionValueSet {
    entries: Vec<(String, FunctionValue)>,
    index: HashMap<String, usize>,
}

impl FunctionValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: FunctionValue) -> Self {
        self.set(name, value);
        self
    }

    /// Bind `name`, replacing any existing binding.
    pub fn set(&mut self, name: impl Into<String>, value: FunctionValue) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    /// Bind `name` only if nothing is bound to it yet. Returns whether it bound.
    pub fn set_default(&mut self, name: impl Into<String>, value: FunctionValue) -> bool {
        let name = name.into();
        if self.index.contains_key(&name) {
            return false;
        }
        self.set(name, value);
        true
    }

    /// Merge `other` into this set; `other` wins on name collisions.
    pub fn append_values(&mut self, other: &FunctionValueSet) {
        for (name, value) in &other.entries {
            self.set(name.clone(), value.clone());
        }
    }

    /// Merge several sets in order; later sets win over earlier ones.
    pub fn append<'a, I>(&mut self, others: I)
    where
        I: IntoIterator<Item = &'a FunctionValueSet>,
    {
        for other in others {
            self.append_values(other);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionValue> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FunctionValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
