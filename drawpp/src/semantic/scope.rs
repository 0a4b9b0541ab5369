use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Number,
    Cursor,
    Function,
}

impl SymbolKind {
    /// Word used in diagnostics.
    pub fn noun(&self) -> &'static str {
        match self {
            SymbolKind::Number => "variable",
            SymbolKind::Cursor => "cursor",
            SymbolKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, SymbolKind>,
}

/// Scopes live in one arena and point at their parent, so closed scopes are
/// kept but no longer reachable from the current one.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            current: ScopeId(0),
        }
    }

    pub fn enter_scope(&mut self) {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(self.current),
            symbols: HashMap::new(),
        });
        self.current = id;
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scope(self.current).and_then(|s| s.parent) {
            self.current = parent;
        }
    }

    /// Declares in the current scope. A name already declared in this same
    /// scope is rejected with the existing kind; outer declarations are shadowed.
    pub fn declare(&mut self, name: &str, kind: SymbolKind) -> Result<(), SymbolKind> {
        let current = self.current;
        let Some(scope) = self.scopes.get_mut(current.0) else {
            return Ok(());
        };
        if let Some(existing) = scope.symbols.get(name) {
            return Err(*existing);
        }
        scope.symbols.insert(name.to_string(), kind);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolKind> {
        let mut next = Some(self.current);
        while let Some(id) = next {
            let scope = self.scope(id)?;
            if let Some(kind) = scope.symbols.get(name) {
                return Some(*kind);
            }
            next = scope.parent;
        }
        None
    }

    fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_and_scope_exit() {
        let mut table = SymbolTable::new();
        assert!(table.declare("x", SymbolKind::Number).is_ok());
        assert_eq!(table.declare("x", SymbolKind::Cursor), Err(SymbolKind::Number));

        table.enter_scope();
        assert!(table.declare("x", SymbolKind::Cursor).is_ok());
        assert!(table.declare("y", SymbolKind::Number).is_ok());
        assert_eq!(table.lookup("x"), Some(SymbolKind::Cursor));
        table.exit_scope();

        assert_eq!(table.lookup("x"), Some(SymbolKind::Number));
        assert_eq!(table.lookup("y"), None);
    }

    #[test]
    fn exiting_the_root_is_a_no_op() {
        let mut table = SymbolTable::new();
        table.exit_scope();
        table.declare("a", SymbolKind::Function).unwrap();
        assert_eq!(table.lookup("a"), Some(SymbolKind::Function));
    }

    #[test]
    fn kinds_name_themselves_in_diagnostics() {
        assert_eq!(SymbolKind::Cursor.noun(), "cursor");
        assert_eq!(SymbolKind::Function.noun(), "function");
        assert_eq!(SymbolKind::Number.noun(), "variable");
    }
}
