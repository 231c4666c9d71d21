//! Tree‑walking evaluator.
//!
//! Statements produce a [`Flow`]: either they ran to completion or a `return`
//! is unwinding towards the nearest function call.  Runtime errors travel
//! separately as `Err(LoxError::Runtime)` and abort the whole run.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::resolver::Bindings;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nested Lox calls allowed before the run fails with "Stack overflow.".
pub const MAX_CALL_DEPTH: usize = 2048;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Completed,
    /// A `return` is in flight, carrying its value.
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    bindings: Bindings,
    out: Box<dyn Write>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout, with the natives (`clock`) defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(std::cell::RefCell::new(Environment::new()));

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            globals
                .borrow_mut()
                .define(native.name, Value::Callable(Callable::Native(Rc::new(native))));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            bindings: Bindings::new(),
            out,
            call_depth: 0,
        }
    }

    /// Make the resolver's depths for a program known before running it.
    pub fn add_bindings(&mut self, bindings: Bindings) {
        self.bindings.extend(bindings);
    }

    /// Interprets a list of statements (a "program").  Stops at the first
    /// runtime error; output already written stays written.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        // The error that stopped the run wins over a failing flush.
        let result = self.execute_all(statements);
        let flushed = self.out.flush();
        result?;
        flushed?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Completed)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Completed)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' as {}", name.lexeme, value.type_name());

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Completed)
            }

            Stmt::Block(statements) => {
                let environment = Environment::child_of(&self.environment);
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Completed)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Completed)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let closure: EnvRef = Rc::clone(&self.environment);
                let function = LoxFunction::new(Rc::clone(decl), closure, false);
                self.environment.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Completed)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Callable(Callable::Class(class)) => Some(class),
                        _ => {
                            let line = match expr {
                                Expr::Variable {
                                    name: super_name, ..
                                } => super_name.line,
                                _ => name.line,
                            };
                            return Err(LoxError::runtime(line, "Superclass must be a class."));
                        }
                    },
                    None => None,
                };

                // Placeholder so methods can refer to the class by name.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                let method_env: EnvRef = match &superclass {
                    Some(parent) => {
                        let env = Environment::child_of(&self.environment);
                        env.borrow_mut()
                            .define("super", Value::Callable(Callable::Class(Rc::clone(parent))));
                        env
                    }
                    None => Rc::clone(&self.environment),
                };

                let mut table: HashMap<String, Rc<LoxFunction>> = HashMap::new();
                for method in methods {
                    let function = LoxFunction::new(
                        Rc::clone(method),
                        Rc::clone(&method_env),
                        method.name.lexeme == "init",
                    );
                    table.insert(method.name.lexeme.clone(), Rc::new(function));
                }

                let class = LoxClass::new(name.lexeme.clone(), superclass, table);
                self.environment
                    .borrow_mut()
                    .assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;

                Ok(Flow::Completed)
            }
        }
    }

    /// Run `statements` inside `environment`, restoring the current one
    /// afterwards whatever the outcome.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Completed)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.bindings.depth(*id) {
                    Some(depth) => {
                        Environment::assign_at(&self.environment, depth, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(callee_val, paren, arg_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.borrow_mut().set(name, value.clone());
                    Ok(value)
                }
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value> {
        let right_val = self.evaluate(expr)?;

        match (&op.token_type, right_val) {
            (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
            (TokenType::MINUS, _) => Err(LoxError::runtime(op.line, "Operand must be a number.")),
            (TokenType::BANG, value) => Ok(Value::Bool(!value.is_truthy())),
            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid unary operator '{}'.", op.lexeme),
            )),
        }
    }

    /// Evaluates a binary expression.
    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            op.lexeme,
            left_val.type_name(),
            right_val.type_name()
        );

        match op.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(left_val != right_val)),
            TokenType::PLUS => {
                return match (left_val, right_val) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                    _ => Err(LoxError::runtime(
                        op.line,
                        "Operands must be two numbers or two strings.",
                    )),
                };
            }
            _ => {}
        }

        let (a, b) = match (left_val, right_val) {
            (Value::Number(a), Value::Number(b)) => (a, b),
            _ => return Err(LoxError::runtime(op.line, "Operands must be numbers.")),
        };

        match op.token_type {
            TokenType::MINUS => Ok(Value::Number(a - b)),
            TokenType::STAR => Ok(Value::Number(a * b)),
            TokenType::SLASH => Ok(Value::Number(a / b)),
            TokenType::GREATER => Ok(Value::Bool(a > b)),
            TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
            TokenType::LESS => Ok(Value::Bool(a < b)),
            TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid binary operator '{}'.", op.lexeme),
            )),
        }
    }

    /// Locals hop straight to their frame; everything else is a global.
    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.bindings.depth(id) {
            Some(depth) => Environment::get_at(&self.environment, depth, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the parent comes from the class that *declared* the
    /// running method, `this` from the frame just inside it.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let depth: usize = self.bindings.depth(id).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Can't use 'super' outside of a class.")
        })?;

        let superclass: Rc<LoxClass> = match Environment::get_at(&self.environment, depth, keyword)?
        {
            Value::Callable(Callable::Class(class)) => class,
            _ => return Err(LoxError::runtime(keyword.line, "Superclass must be a class.")),
        };

        // `this` lives in the frame bound just inside the `super` frame.
        let this = Token::synthetic("this", keyword.line);
        let instance = match Environment::get_at(&self.environment, depth.saturating_sub(1), &this)?
        {
            Value::Instance(instance) => instance,
            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Can't use 'this' outside of a class.",
                ))
            }
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Callable(Callable::Function(Rc::new(
                found.bind(&instance),
            )))),
            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    /// Invokes a callable (native, user-defined function or class).
    fn invoke_callable(
        &mut self,
        callee_val: Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let callable: Callable = match callee_val {
            Value::Callable(callable) => callable,
            _ => {
                return Err(LoxError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                ))
            }
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(paren.line, "Stack overflow."));
        }

        debug!("Calling {} with {} argument(s)", callable, arguments.len());

        self.call_depth += 1;
        let result = callable.call(self, arguments);
        self.call_depth -= 1;

        result
    }
}

// ───────────────────────────── natives ─────────────────────────────

fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }]
}

/// Seconds since the Unix epoch, millisecond resolution.
fn clock(_args: &[Value]) -> Result<Value> {
    let millis: i64 = chrono::Utc::now().timestamp_millis();
    Ok(Value::Number(millis as f64 / 1000.0))
}
