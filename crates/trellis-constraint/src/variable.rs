//! Symbolic unknowns and the session-scoped allocator that names them.

use std::fmt;
use std::sync::Arc;

/// Role a variable plays in the tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableKind {
    /// A collaborator-owned unknown (box edge, size, ...)
    Normal,
    /// Nonnegative slack turning an inequality into an equality
    Slack,
    /// Error variable absorbing violation of an optional constraint
    Error,
    /// Temporary variable seeding a Phase-1 row
    Artificial,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::Normal => "Normal",
            VariableKind::Slack => "Slack",
            VariableKind::Error => "Error",
            VariableKind::Artificial => "Artificial",
        };
        f.write_str(name)
    }
}

/// A uniquely identified symbolic unknown.
///
/// Equality and hashing cover the whole `(id, kind, name)` triple, so two
/// independently built values with the same triple are the same variable.
/// Collaborators that need to refer to a variable again must keep the value
/// they were handed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    id: u32,
    kind: VariableKind,
    name: Arc<str>,
}

impl Variable {
    /// Build a variable from an explicit triple.
    pub fn new(id: u32, kind: VariableKind, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_external(&self) -> bool {
        self.kind == VariableKind::Normal
    }

    pub fn is_slack(&self) -> bool {
        self.kind == VariableKind::Slack
    }

    pub fn is_error(&self) -> bool {
        self.kind == VariableKind::Error
    }

    pub fn is_artificial(&self) -> bool {
        self.kind == VariableKind::Artificial
    }

    /// Slack and error variables.
    pub fn is_pivotable(&self) -> bool {
        self.is_slack() || self.is_error()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{}|{}]", self.name, self.id, self.kind)
    }
}

/// Hands out variable ids for one solving session.
///
/// Ids are strictly increasing, so variables allocated from the same
/// allocator never collide. Two allocators are independent of each other,
/// which keeps identity generation deterministic in tests.
#[derive(Debug, Clone)]
pub struct VariableAllocator {
    next: u32,
}

impl VariableAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Start allocating from a known id.
    pub fn with_next(next: u32) -> Self {
        Self { next }
    }

    /// Peek at the next id without consuming it.
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Allocate a variable of the given kind.
    pub fn allocate(&mut self, kind: VariableKind, name: impl Into<Arc<str>>) -> Variable {
        let id = self.next;
        self.next += 1;
        Variable::new(id, kind, name)
    }

    /// Allocate a collaborator-owned variable.
    pub fn normal(&mut self, name: impl Into<Arc<str>>) -> Variable {
        self.allocate(VariableKind::Normal, name)
    }
}

impl Default for VariableAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        let a = Variable::new(7, VariableKind::Normal, "x");
        let b = Variable::new(7, VariableKind::Normal, "x");
        assert_eq!(a, b);
        assert_ne!(a, Variable::new(7, VariableKind::Slack, "x"));
        assert_ne!(a, Variable::new(8, VariableKind::Normal, "x"));
        assert_ne!(a, Variable::new(7, VariableKind::Normal, "y"));
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let mut alloc = VariableAllocator::new();
        let x = alloc.normal("x");
        let y = alloc.normal("x");
        assert!(y.id() > x.id());
        assert_ne!(x, y);
        assert_eq!(alloc.peek(), y.id() + 1);
    }

    #[test]
    fn test_independent_allocators_are_deterministic() {
        let mut first = VariableAllocator::with_next(10);
        let mut second = VariableAllocator::with_next(10);
        assert_eq!(first.normal("w"), second.normal("w"));
    }

    #[test]
    fn test_kind_predicates() {
        let mut alloc = VariableAllocator::default();
        let s = alloc.allocate(VariableKind::Slack, "s1");
        let e = alloc.allocate(VariableKind::Error, "ep1");
        let a = alloc.allocate(VariableKind::Artificial, "a1");
        assert!(s.is_pivotable() && e.is_pivotable());
        assert!(!a.is_pivotable() && a.is_artificial());
        assert_eq!(s.to_string(), format!("[s1|{}|Slack]", s.id()));
    }
}
