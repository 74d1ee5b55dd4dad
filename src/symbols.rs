//! Scoped symbol table and overload resolution

use crate::ir::Id;
use crate::types::{rank, TypeInfo};
use std::collections::HashMap;

/// What a name refers to
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Storage; `ty` is a pointer type
    Variable {
        /// `Variable` or `FunctionParameter` node
        id: Id,
        /// Type of the storage
        ty: TypeInfo,
    },
    /// Named compile-time constant
    Constant {
        /// Constant node
        id: Id,
        /// Value type
        ty: TypeInfo,
    },
    /// Struct type
    Struct {
        /// `TypeStruct` node
        id: Id,
        /// Index into the parser's struct list
        index: usize,
    },
    /// `typedef` alias
    Alias(TypeInfo),
    /// Overload set, indices into the parser's function list
    Functions(Vec<usize>),
}

/// Why a name could not be declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redefinition;

/// Why overload resolution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadError {
    /// No candidate accepts the arguments
    NoMatch,
    /// Several candidates share the best rank
    Ambiguous,
}

/// Stack of lexical scopes with namespace-qualified names
///
/// The global scope is always present. Names are stored qualified with the
/// namespace they were declared in and looked up from the innermost namespace
/// outwards.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
    namespaces: Vec<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Table with only the global scope
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            namespaces: Vec::new(),
        }
    }

    /// Drop everything but an empty global scope
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Push a block scope
    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost block scope; the global scope is never popped
    pub fn leave_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Whether declarations currently go into the global scope
    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Open `namespace name { ... }`
    pub fn enter_namespace(&mut self, name: &str) {
        self.namespaces.push(name.to_string());
    }

    /// Close the innermost namespace
    pub fn leave_namespace(&mut self) {
        self.namespaces.pop();
    }

    /// `A::B::` prefix of the current namespace, empty at the top
    pub fn namespace_prefix(&self) -> String {
        self.namespaces
            .iter()
            .map(|n| format!("{}::", n))
            .collect()
    }

    /// Fully qualified form of a name declared here
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{}", self.namespace_prefix(), name)
    }

    /// Declare a variable, constant, struct or alias in the innermost scope
    pub fn insert(&mut self, name: &str, symbol: Symbol) -> Result<(), Redefinition> {
        let key = self.qualify(name);
        let scope = self.current_scope();
        if scope.contains_key(&key) {
            return Err(Redefinition);
        }
        scope.insert(key, symbol);
        Ok(())
    }

    /// Add a function to the overload set of `name` in the innermost scope
    pub fn insert_function(&mut self, name: &str, index: usize) -> Result<(), Redefinition> {
        let key = self.qualify(name);
        let scope = self.current_scope();
        match scope.get_mut(&key) {
            Some(Symbol::Functions(set)) => {
                set.push(index);
                Ok(())
            }
            Some(_) => Err(Redefinition),
            None => {
                scope.insert(key, Symbol::Functions(vec![index]));
                Ok(())
            }
        }
    }

    fn current_scope(&mut self) -> &mut HashMap<String, Symbol> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Candidate qualified spellings of `name`, innermost namespace first
    fn candidates(&self, name: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(self.namespaces.len() + 1);
        for depth in (0..=self.namespaces.len()).rev() {
            let prefix: String = self.namespaces[..depth]
                .iter()
                .map(|n| format!("{}::", n))
                .collect();
            out.push(format!("{}{}", prefix, name));
        }
        out
    }

    /// Innermost visible symbol named `name`
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        let candidates = self.candidates(name);
        for scope in self.scopes.iter().rev() {
            for key in &candidates {
                if let Some(symbol) = scope.get(key) {
                    return Some(symbol);
                }
            }
        }
        None
    }

    /// All visible overloads of `name`, innermost scope first
    pub fn find_functions(&self, name: &str) -> Vec<usize> {
        let candidates = self.candidates(name);
        let mut out = Vec::new();
        for scope in self.scopes.iter().rev() {
            for key in &candidates {
                if let Some(Symbol::Functions(set)) = scope.get(key) {
                    for index in set {
                        if !out.contains(index) {
                            out.push(*index);
                        }
                    }
                }
            }
        }
        out
    }

    /// Whether `name` is declared in the innermost scope itself
    pub fn declared_here(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|s| s.contains_key(&self.qualify(name)))
            .unwrap_or(false)
    }
}

/// Pick the candidate with the lowest total conversion rank
///
/// Candidates whose parameter count differs from `args` or that need an
/// impossible conversion are skipped. A tie for the lowest total is
/// ambiguous.
pub fn resolve_overload<'a, C, I>(candidates: I, args: &[TypeInfo]) -> Result<C, OverloadError>
where
    I: IntoIterator<Item = (C, &'a [TypeInfo])>,
{
    let mut best: Option<(C, u32)> = None;
    let mut tied = false;

    for (candidate, params) in candidates {
        if params.len() != args.len() {
            continue;
        }
        let total = args
            .iter()
            .zip(params)
            .try_fold(0u32, |sum, (arg, param)| {
                rank(&arg.value(), &param.value()).map(|r| sum + r)
            });
        let Some(total) = total else {
            continue;
        };

        match best.as_ref().map(|(_, score)| *score) {
            Some(score) if total > score => {}
            Some(score) if total == score => tied = true,
            _ => {
                best = Some((candidate, total));
                tied = false;
            }
        }
    }

    match best {
        Some(_) if tied => Err(OverloadError::Ambiguous),
        Some((candidate, _)) => Ok(candidate),
        None => Err(OverloadError::NoMatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(id: u32) -> Symbol {
        Symbol::Variable {
            id: Id(id),
            ty: TypeInfo::float(1, 1).pointer(),
        }
    }

    #[test]
    fn test_shadowing_and_scopes() {
        let mut table = SymbolTable::new();
        table.insert("x", var(100)).unwrap();
        table.enter_scope();
        assert!(!table.declared_here("x"));
        table.insert("x", var(101)).unwrap();
        assert_eq!(table.find("x"), Some(&var(101)));
        table.leave_scope();
        assert_eq!(table.find("x"), Some(&var(100)));
        table.leave_scope();
        assert!(table.is_global());
    }

    #[test]
    fn test_redefinition_in_same_scope() {
        let mut table = SymbolTable::new();
        table.insert("S", Symbol::Struct { id: Id(100), index: 0 }).unwrap();
        assert_eq!(table.insert("S", var(101)), Err(Redefinition));
        assert_eq!(table.insert_function("S", 0), Err(Redefinition));
    }

    #[test]
    fn test_namespaces() {
        let mut table = SymbolTable::new();
        table.enter_namespace("A");
        table.insert("x", var(100)).unwrap();
        assert_eq!(table.find("x"), Some(&var(100)));
        table.leave_namespace();
        assert_eq!(table.find("x"), None);
        assert_eq!(table.find("A::x"), Some(&var(100)));
    }

    #[test]
    fn test_overload_sets_merge_across_scopes() {
        let mut table = SymbolTable::new();
        table.insert_function("f", 0).unwrap();
        table.insert_function("f", 1).unwrap();
        assert_eq!(table.find_functions("f"), vec![0, 1]);
    }

    #[test]
    fn test_resolve_overload() {
        let ff = [TypeInfo::float(1, 1), TypeInfo::float(1, 1)];
        let ii = [TypeInfo::int(1, 1), TypeInfo::int(1, 1)];
        let args = [TypeInfo::int(1, 1), TypeInfo::float(1, 1)];
        let picked = resolve_overload([("ff", &ff[..]), ("ii", &ii[..])], &args);
        assert_eq!(picked, Ok("ff"));

        let if_ = [TypeInfo::int(1, 1), TypeInfo::float(1, 1)];
        let fi = [TypeInfo::float(1, 1), TypeInfo::int(1, 1)];
        let args = [TypeInfo::int(1, 1), TypeInfo::int(1, 1)];
        let picked = resolve_overload([("if", &if_[..]), ("fi", &fi[..])], &args);
        assert_eq!(picked, Err(OverloadError::Ambiguous));

        let s = [TypeInfo::structure(Id(100))];
        let picked = resolve_overload([("s", &s[..])], &[TypeInfo::float(1, 1)]);
        assert_eq!(picked, Err(OverloadError::NoMatch));
    }
}
