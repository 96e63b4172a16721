use std::collections::HashMap;

use log::trace;

use crate::{
    interpreter::{LoxValue, RuntimeError, RuntimeErrorKind},
    scanner::Token,
};

/// Handle to one scope in an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

struct Scope {
    variables: HashMap<String, LoxValue>,
    enclosing: Option<ScopeId>,
}

/// Arena of scopes; index 0 is the global scope.
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![Scope {
                variables: HashMap::new(),
                enclosing: None,
            }],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub(crate) fn push(&mut self, enclosing: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            variables: HashMap::new(),
            enclosing: Some(enclosing),
        });
        let id = ScopeId(self.scopes.len() - 1);
        trace!("opened scope {} inside {}", id.0, enclosing.0);
        id
    }

    /// Releases `scope` and every scope opened after it. The global scope is
    /// never released.
    pub(crate) fn pop(&mut self, scope: ScopeId) {
        debug_assert_eq!(scope.0 + 1, self.scopes.len(), "scopes close innermost first");
        trace!("closed scope {}", scope.0);
        self.scopes.truncate(scope.0.max(1));
    }

    /// Binds `name` in `scope` itself, shadowing any outer binding.
    pub fn define(&mut self, scope: ScopeId, name: String, value: LoxValue) {
        if let Some(scope) = self.scopes.get_mut(scope.0) {
            scope.variables.insert(name, value);
        }
    }

    pub fn get(&self, scope: ScopeId, name: &Token) -> Result<LoxValue, RuntimeError> {
        let mut next = Some(scope);
        while let Some(scope) = next.and_then(|id| self.scopes.get(id.0)) {
            if let Some(value) = scope.variables.get(&name.lexeme) {
                return Ok(value.clone());
            }
            next = scope.enclosing;
        }

        Err(undefined(name))
    }

    /// Overwrites the nearest existing binding of `name`; never creates one.
    pub fn assign(
        &mut self,
        scope: ScopeId,
        name: &Token,
        value: LoxValue,
    ) -> Result<(), RuntimeError> {
        let mut next = Some(scope);
        while let Some(id) = next {
            let Some(scope) = self.scopes.get_mut(id.0) else {
                break;
            };
            if let Some(slot) = scope.variables.get_mut(&name.lexeme) {
                *slot = value;
                return Ok(());
            }
            next = scope.enclosing;
        }

        Err(undefined(name))
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError {
        token: name.clone(),
        kind: RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
    }
}
