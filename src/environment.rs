//! Scope frames.
//!
//! A frame is shared by every closure and active call that refers to it, so
//! frames live behind [`EnvRef`] (`Rc<RefCell<Environment>>`) handles.  Any
//! holder may mutate a frame and every other holder observes the change.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root frame (the globals).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh frame on top of `enclosing` into a shared handle.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Introduce or overwrite a binding in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in this frame, then along the enclosing chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite an existing binding found in this frame or an ancestor.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The frame exactly `depth` hops up from `env` (`0` is `env` itself).
    pub fn ancestor(env: &EnvRef, depth: usize) -> Result<EnvRef> {
        let mut frame: EnvRef = Rc::clone(env);

        for _ in 0..depth {
            let parent = frame.borrow().enclosing.clone();
            frame = parent.ok_or_else(|| {
                LoxError::runtime(0, format!("No scope {} level(s) up.", depth))
            })?;
        }

        Ok(frame)
    }

    /// Read `name` directly from the frame `depth` hops up.  No search along
    /// the way: the resolver already proved where the binding lives.
    pub fn get_at(env: &EnvRef, depth: usize, name: &Token) -> Result<Value> {
        debug!("get_at depth={} name={}", depth, name.lexeme);

        let frame: EnvRef = Self::ancestor(env, depth)?;
        let value = frame.borrow().values.get(&name.lexeme).cloned();

        value.ok_or_else(|| undefined(name))
    }

    pub fn assign_at(env: &EnvRef, depth: usize, name: &Token, value: Value) -> Result<()> {
        debug!("assign_at depth={} name={}", depth, name.lexeme);

        let frame: EnvRef = Self::ancestor(env, depth)?;
        let mut frame = frame.borrow_mut();

        match frame.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Token {
        Token::synthetic(name, 1)
    }

    #[test]
    fn lookup_walks_enclosing_chain() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&globals);
        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));

        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();
        assert_eq!(globals.borrow().get(&ident("a")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn missing_binding_is_runtime_error() {
        let env = Environment::new();
        let err = env.get(&ident("nope")).unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'nope'.");

        let mut env = env;
        assert!(env.assign(&ident("nope"), Value::Nil).is_err());
    }

    #[test]
    fn get_at_skips_shadowing_frames() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a", Value::String("outer".into()));

        let inner = Environment::child_of(&outer);
        inner
            .borrow_mut()
            .define("a", Value::String("inner".into()));

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("a")).unwrap(),
            Value::String("outer".into())
        );
        assert_eq!(
            Environment::get_at(&inner, 0, &ident("a")).unwrap(),
            Value::String("inner".into())
        );

        Environment::assign_at(&inner, 1, &ident("a"), Value::Bool(true)).unwrap();
        assert_eq!(outer.borrow().get(&ident("a")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn frames_are_shared_between_handles() {
        let frame: EnvRef = Rc::new(RefCell::new(Environment::new()));
        let first = Environment::child_of(&frame);
        let second = Environment::child_of(&frame);

        // the frame itself plus one handle per child
        assert_eq!(Rc::strong_count(&frame), 3);

        frame.borrow_mut().define("n", Value::Number(0.0));
        Environment::assign_at(&first, 1, &ident("n"), Value::Number(5.0)).unwrap();
        assert_eq!(
            Environment::get_at(&second, 1, &ident("n")).unwrap(),
            Value::Number(5.0)
        );

        drop(first);
        drop(second);
        assert_eq!(Rc::strong_count(&frame), 1);
    }
}
