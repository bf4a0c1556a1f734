// interp.rs: Reference interpreter for dispatch plans
//
// Executes a `DispatchPlan` against concrete state values exactly as a
// generated dispatcher would: with no previous state every operation is
// invoked in declaration order; otherwise each update rule is evaluated
// left to right with short-circuiting, and cached comparisons are computed
// once, right before the first rule that uses them.
//
// Preconditions: the plan came from `plan::build`.
// Postconditions: the receiver sees invocations in plan order, arguments
//                 read from the new state.
// Failure modes: missing fields, null in a non-null field, no receiver.
// Side effects: calls into the receiver.

use crate::equality::EqualityStrategy;
use crate::id::{FieldId, OperationId};
use crate::plan::{ChangeTerm, DispatchPlan};

// ── Values ─────────────────────────────────────────────────────────────────

/// An object instance. Types without structural equality compare by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub identity: u64,
    pub structural_equality: bool,
    pub fields: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Char(char),
    Float(f32),
    Double(f64),
    Text(String),
    Array(Vec<Value>),
    Object(ObjectValue),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// One snapshot of the state type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateValue {
    fields: Vec<(String, Value)>,
}

impl StateValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any earlier value.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

// ── Equality ───────────────────────────────────────────────────────────────

fn canonical_f32_eq(a: f32, b: f32) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

fn canonical_f64_eq(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

fn elementwise_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| structural_eq(x, y))
}

/// Value equality as the platform's equals contract defines it.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Float(x), Value::Float(y)) => canonical_f32_eq(*x, *y),
        (Value::Double(x), Value::Double(y)) => canonical_f64_eq(*x, *y),
        (Value::Array(x), Value::Array(y)) => elementwise_eq(x, y),
        (Value::Object(x), Value::Object(y)) => {
            if x.structural_equality && y.structural_equality {
                x.fields.len() == y.fields.len()
                    && x.fields
                        .iter()
                        .zip(&y.fields)
                        .all(|((xn, xv), (yn, yv))| xn == yn && structural_eq(xv, yv))
            } else {
                x.identity == y.identity
            }
        }
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => x == y,
        _ => false,
    }
}

/// True if the strategy reports `old` and `new` as different.
pub fn changed(strategy: EqualityStrategy, old: &Value, new: &Value) -> bool {
    match strategy {
        EqualityStrategy::DirectInequality => match (old, new) {
            (Value::Int(x), Value::Int(y)) => x != y,
            (Value::Bool(x), Value::Bool(y)) => x != y,
            (Value::Char(x), Value::Char(y)) => x != y,
            _ => !structural_eq(old, new),
        },
        EqualityStrategy::CanonicalFloat(_) => !structural_eq(old, new),
        EqualityStrategy::Elementwise { .. } | EqualityStrategy::NullSafe { .. } => {
            match (old.is_null(), new.is_null()) {
                (true, true) => false,
                (true, false) | (false, true) => true,
                (false, false) => !structural_eq(old, new),
            }
        }
    }
}

// ── Receiver ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub operation: String,
    pub arguments: Vec<Value>,
}

/// The implementation of the receiver interface.
pub trait Receiver {
    fn invoke(&mut self, operation: &str, arguments: Vec<Value>);
}

/// Records invocations; handy for tests.
impl Receiver for Vec<Invocation> {
    fn invoke(&mut self, operation: &str, arguments: Vec<Value>) {
        self.push(Invocation {
            operation: operation.to_string(),
            arguments,
        });
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatcher for `{state}` built without a receiver")]
    MissingReceiver { state: String },
    #[error("state value has no field `{field}`")]
    MissingField { field: String },
    #[error("field `{field}` is declared non-null but holds null")]
    UnexpectedNull { field: String },
}

// ── Dispatcher ─────────────────────────────────────────────────────────────

pub struct DispatcherBuilder<'p, R> {
    plan: &'p DispatchPlan,
    receiver: Option<R>,
}

impl<'p, R: Receiver> DispatcherBuilder<'p, R> {
    pub fn new(plan: &'p DispatchPlan) -> Self {
        Self {
            plan,
            receiver: None,
        }
    }

    pub fn receiver(mut self, receiver: R) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Fails if no receiver was supplied.
    pub fn build(self) -> Result<Dispatcher<'p, R>, DispatchError> {
        match self.receiver {
            Some(receiver) => Ok(Dispatcher {
                plan: self.plan,
                receiver,
            }),
            None => Err(DispatchError::MissingReceiver {
                state: self.plan.state_name.clone(),
            }),
        }
    }
}

pub struct Dispatcher<'p, R> {
    plan: &'p DispatchPlan,
    receiver: R,
}

impl<'p, R: Receiver> Dispatcher<'p, R> {
    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn into_receiver(self) -> R {
        self.receiver
    }

    /// Invoke the operations whose inputs changed between `previous` and `new`.
    pub fn dispatch(
        &mut self,
        new: &StateValue,
        previous: Option<&StateValue>,
    ) -> Result<(), DispatchError> {
        let plan = self.plan;
        let Some(previous) = previous else {
            for &op in &plan.initial_calls {
                self.call(op, new)?;
            }
            return Ok(());
        };

        let mut cache: Vec<Option<bool>> = vec![None; plan.shared_comparisons.len()];
        for rule in &plan.update_rules {
            for cached in plan.introduced_at(rule.operation) {
                let value = self.field_changed(cached.field, cached.strategy, previous, new)?;
                cache[cached.id.index()] = Some(value);
            }

            let mut fire = false;
            for term in &rule.terms {
                let hit = match *term {
                    ChangeTerm::Cached(id) => match cache[id.index()] {
                        Some(value) => value,
                        None => {
                            let cached = plan.comparison(id);
                            let value =
                                self.field_changed(cached.field, cached.strategy, previous, new)?;
                            cache[id.index()] = Some(value);
                            value
                        }
                    },
                    ChangeTerm::Inline { field, strategy } => {
                        self.field_changed(field, strategy, previous, new)?
                    }
                };
                if hit {
                    fire = true;
                    break;
                }
            }
            if fire {
                self.call(rule.operation, new)?;
            }
        }
        Ok(())
    }

    fn read<'s>(&self, state: &'s StateValue, field: FieldId) -> Result<&'s Value, DispatchError> {
        let spec = self.plan.field(field);
        let value = state
            .get(&spec.name)
            .ok_or_else(|| DispatchError::MissingField {
                field: spec.name.clone(),
            })?;
        if value.is_null() && !spec.nullable {
            return Err(DispatchError::UnexpectedNull {
                field: spec.name.clone(),
            });
        }
        Ok(value)
    }

    fn field_changed(
        &self,
        field: FieldId,
        strategy: EqualityStrategy,
        previous: &StateValue,
        new: &StateValue,
    ) -> Result<bool, DispatchError> {
        let old = self.read(previous, field)?;
        let new = self.read(new, field)?;
        Ok(changed(strategy, old, new))
    }

    fn call(&mut self, op: OperationId, new: &StateValue) -> Result<(), DispatchError> {
        let plan = self.plan;
        let mut arguments = Vec::with_capacity(plan.arguments(op).len());
        for &field in plan.arguments(op) {
            arguments.push(self.read(new, field)?.clone());
        }
        self.receiver.invoke(&plan.operation(op).name, arguments);
        Ok(())
    }
}
