use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::ast::{is_slice_node, Node};
use crate::functions;
use crate::value::Value;

/// Errors that can occur during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A value kind that does not satisfy a type constraint
    InvalidType {
        got: &'static str,
        want: &'static str,
    },
    /// A numeric argument that is fractional or out of integer range
    IntegerConversion(Decimal),
    /// A negative integer where a non-negative one is required
    NegativeInteger(i64),
    /// A padding string that is not exactly one character
    PadLength(String),
    /// A `from_items` entry that is not a two-element array
    FromItemsLength(usize),
    /// A `from_items` entry whose key is not a string
    FromItemsKey(&'static str),
    /// A `$name` reference with no binding in any enclosing scope
    UndefinedVariable(String),
    /// An arithmetic operation produced an infinity
    Infinity,
    /// An arithmetic operation produced a not-a-number result
    NotANumber,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::InvalidType { got, want } => {
                write!(f, "invalid type {} when expecting {}", got, want)
            }
            EvalError::IntegerConversion(d) => {
                write!(f, "error converting value to integer: {}", d)
            }
            EvalError::NegativeInteger(i) => {
                write!(f, "negative integer {} where positive integer required", i)
            }
            EvalError::PadLength(p) => {
                write!(f, "padding {:?} must have a length of 1", p)
            }
            EvalError::FromItemsLength(l) => {
                write!(f, "array passed to from_items contains an item of length {}", l)
            }
            EvalError::FromItemsKey(t) => {
                write!(
                    f,
                    "array passed to from_items contains an item with a key of type {}",
                    t
                )
            }
            EvalError::UndefinedVariable(name) => write!(f, "undefined variable {:?}", name),
            EvalError::Infinity => write!(f, "result of operation is an infinity"),
            EvalError::NotANumber => write!(f, "result of operation is not a number"),
        }
    }
}

impl std::error::Error for EvalError {}

/// A lexical variable scope: one frame of bindings plus a parent pointer.
/// Scopes are created by `let` and live only for the duration of its body.
struct Scope<'a> {
    parent: Option<&'a Scope<'a>>,
    variables: HashMap<String, Value>,
}

impl Scope<'_> {
    fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.variables.get(name) {
            return Some(value);
        }

        self.parent.and_then(|p| p.get(name))
    }
}

/// Evaluate an operation tree against input data.
///
/// The input is never mutated; the result is a freshly built value. All
/// transient state (current value, variable scopes) is allocated per call,
/// so a shared tree can be evaluated concurrently against distinct data.
pub fn evaluate(node: &Node, data: &Value) -> Result<Value, EvalError> {
    let e = Evaluator { root: data };
    e.eval(node, data, None)
}

struct Evaluator<'a> {
    root: &'a Value,
}

impl Evaluator<'_> {
    fn eval(
        &self,
        node: &Node,
        current: &Value,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        match node {
            Node::Bool(b) => Ok(Value::Bool(*b)),
            Node::Null => Ok(Value::Null),
            Node::Literal(value) => Ok(value.clone()),
            Node::Current => Ok(current.clone()),
            Node::Root => Ok(self.root.clone()),
            Node::Variable(name) => match scope.and_then(|s| s.get(name)) {
                Some(value) => Ok(value.clone()),
                None => Err(EvalError::UndefinedVariable(name.clone())),
            },

            Node::Field(name) => Ok(functions::field(name, current)),
            Node::PipeField { left, field } => {
                let left = self.eval(left, current, scope)?;
                Ok(functions::field(field, &left))
            }
            Node::Index { child, index } => {
                let child = self.eval(child, current, scope)?;
                Ok(functions::index(&child, *index))
            }
            Node::IndexCurrent { index } => Ok(functions::index(current, *index)),
            Node::SmallIndexCurrent(index) => Ok(functions::index(current, *index as i64)),

            Node::Slice { child, start, stop } => {
                let child = self.eval(child, current, scope)?;
                Ok(functions::slice(&child, *start, *stop))
            }
            Node::SliceCurrent { start, stop } => Ok(functions::slice(current, *start, *stop)),
            Node::SliceStep {
                child,
                start,
                stop,
                step,
            } => {
                let child = self.eval(child, current, scope)?;
                Ok(functions::slice_step(&child, *start, *stop, *step))
            }
            Node::SliceStepCurrent { start, stop, step } => {
                Ok(functions::slice_step(current, *start, *stop, *step))
            }

            Node::ProjectArray { left, right } => {
                let value = self.eval(left, current, scope)?;

                // Slicing a string followed by a continuation is a plain
                // pipe, not a projection over its characters.
                if matches!(value, Value::String(_)) && is_slice_node(left) {
                    return self.eval(right, &value, scope);
                }

                self.project_array(&value, right, scope)
            }
            Node::ProjectArrayCurrent { right } => self.project_array(current, right, scope),
            Node::ProjectObject { left, right } => {
                let value = self.eval(left, current, scope)?;
                self.project_object(&value, right, scope)
            }
            Node::ProjectObjectCurrent { right } => self.project_object(current, right, scope),
            Node::FlattenProject { left, right } => {
                let value = self.eval(left, current, scope)?;
                self.flatten_and_project(&value, right, scope)
            }
            Node::FlattenProjectCurrent { right } => {
                self.flatten_and_project(current, right, scope)
            }
            Node::FilterProject {
                left,
                filter,
                right,
            } => {
                let value = self.eval(left, current, scope)?;
                self.filter_and_project(&value, filter, right, scope)
            }
            Node::FilterProjectCurrent { filter, right } => {
                self.filter_and_project(current, filter, right, scope)
            }

            Node::PruneArray { child } => {
                let child = self.eval(child, current, scope)?;
                Ok(functions::prune_array(&child))
            }
            Node::PruneArrayCurrent => Ok(functions::prune_array(current)),
            Node::ObjectValues { child } => {
                let child = self.eval(child, current, scope)?;
                Ok(functions::object_values(&child))
            }
            Node::ObjectValuesCurrent => Ok(functions::object_values(current)),
            Node::Flatten { child } => {
                let child = self.eval(child, current, scope)?;
                Ok(functions::flatten(&child))
            }
            Node::FlattenCurrent => Ok(functions::flatten(current)),
            Node::Filter { child, filter } => {
                let child = self.eval(child, current, scope)?;
                self.filter(&child, filter, scope)
            }
            Node::FilterCurrent { filter } => self.filter(current, filter, scope),

            Node::SelectArray { child, fields } => {
                let child = self.eval(child, current, scope)?;

                if matches!(child, Value::Null) {
                    return Ok(Value::Null);
                }

                self.select_array(fields, &child, scope)
            }
            Node::SelectArrayCurrent { fields } => {
                if matches!(current, Value::Null) {
                    return Ok(Value::Null);
                }

                self.select_array(fields, current, scope)
            }
            Node::SelectArraySingle { child, field } => {
                let child = self.eval(child, current, scope)?;

                if matches!(child, Value::Null) {
                    return Ok(Value::Null);
                }

                let result = self.eval(field, &child, scope)?;
                Ok(Value::Array(vec![result]))
            }
            Node::SelectArraySingleCurrent { field } => {
                let result = self.eval(field, current, scope)?;
                Ok(Value::Array(vec![result]))
            }
            Node::SelectObject { child, fields } => {
                let child = self.eval(child, current, scope)?;

                if matches!(child, Value::Null) {
                    return Ok(Value::Null);
                }

                self.select_object(fields, &child, scope)
            }
            Node::SelectObjectCurrent { fields } => {
                if matches!(current, Value::Null) {
                    return Ok(Value::Null);
                }

                self.select_object(fields, current, scope)
            }
            Node::SelectObjectSingle { child, key, field } => {
                let child = self.eval(child, current, scope)?;

                if matches!(child, Value::Null) {
                    return Ok(Value::Null);
                }

                let result = self.eval(field, &child, scope)?;

                let mut object = HashMap::with_capacity(1);
                object.insert(key.clone(), result);
                Ok(Value::Object(object))
            }
            Node::SelectObjectSingleCurrent { key, field } => {
                let result = self.eval(field, current, scope)?;

                let mut object = HashMap::with_capacity(1);
                object.insert(key.clone(), result);
                Ok(Value::Object(object))
            }

            Node::Pipe { left, right } => {
                let left = self.eval(left, current, scope)?;
                self.eval(right, &left, scope)
            }
            Node::And { left, right } => {
                let left = self.eval(left, current, scope)?;

                if !left.is_truthy() {
                    return Ok(left);
                }

                self.eval(right, current, scope)
            }
            Node::Or { left, right } => {
                let left = self.eval(left, current, scope)?;

                if left.is_truthy() {
                    return Ok(left);
                }

                self.eval(right, current, scope)
            }
            Node::Not { child } => {
                let child = self.eval(child, current, scope)?;
                Ok(Value::Bool(!child.is_truthy()))
            }
            Node::AssertNumber { child } => {
                let child = self.eval(child, current, scope)?;

                if child.is_number() {
                    return Ok(child);
                }

                Ok(Value::Null)
            }
            Node::Negate { child } => {
                let child = self.eval(child, current, scope)?;

                if let Some(f) = child.as_float() {
                    return Ok(Value::from(-f));
                }

                match child.as_decimal() {
                    Some(d) if d.is_zero() => Ok(Value::from(d)),
                    Some(d) => Ok(Value::from(-d)),
                    None => Ok(Value::Null),
                }
            }

            Node::Add { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                functions::add(&left, &right)
            }
            Node::Subtract { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                functions::subtract(&left, &right)
            }
            Node::Multiply { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                functions::multiply(&left, &right)
            }
            Node::Divide { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                functions::divide(&left, &right)
            }
            Node::IntegerDivide { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                functions::integer_divide(&left, &right)
            }
            Node::Modulo { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                functions::modulo(&left, &right)
            }

            Node::Equal { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                Ok(Value::Bool(left == right))
            }
            Node::NotEqual { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                Ok(Value::Bool(left != right))
            }
            Node::Less { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                Ok(functions::less(&left, &right))
            }
            Node::LessOrEqual { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                Ok(functions::less_or_equal(&left, &right))
            }
            Node::Greater { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                Ok(functions::greater(&left, &right))
            }
            Node::GreaterOrEqual { left, right } => {
                let left = self.eval(left, current, scope)?;
                let right = self.eval(right, current, scope)?;
                Ok(functions::greater_or_equal(&left, &right))
            }

            Node::DefineVariables { bindings, child } => {
                // Bindings are non-recursive: each one is evaluated in the
                // outer scope.
                let mut variables = HashMap::with_capacity(bindings.len());
                for (name, node) in bindings {
                    let value = self.eval(node, current, scope)?;
                    variables.insert(name.clone(), value);
                }

                let inner = Scope {
                    parent: scope,
                    variables,
                };

                self.eval(child, current, Some(&inner))
            }

            Node::Abs(arg) => functions::abs(&self.eval(arg, current, scope)?),
            Node::Avg(arg) => functions::avg(&self.eval(arg, current, scope)?),
            Node::Ceil(arg) => functions::ceil(&self.eval(arg, current, scope)?),
            Node::Contains(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::contains(&arg1, &arg2)
            }
            Node::EndsWith(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::ends_with(&arg1, &arg2)
            }
            Node::FindFirst(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::find_first(&arg1, &arg2)
            }
            Node::FindFirstFrom(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                functions::find_first_from(&arg1, &arg2, &arg3)
            }
            Node::FindFirstBetween(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                let arg4 = self.eval(&args[3], current, scope)?;
                functions::find_first_between(&arg1, &arg2, &arg3, &arg4)
            }
            Node::FindLast(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::find_last(&arg1, &arg2)
            }
            Node::FindLastFrom(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                functions::find_last_from(&arg1, &arg2, &arg3)
            }
            Node::FindLastBetween(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                let arg4 = self.eval(&args[3], current, scope)?;
                functions::find_last_between(&arg1, &arg2, &arg3, &arg4)
            }
            Node::Floor(arg) => functions::floor(&self.eval(arg, current, scope)?),
            Node::FromItems(arg) => functions::from_items(&self.eval(arg, current, scope)?),
            Node::GroupBy(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                self.group_by(&arg1, &args[1], scope)
            }
            Node::Items(arg) => functions::items(&self.eval(arg, current, scope)?),
            Node::Join(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::join(&arg1, &arg2)
            }
            Node::Keys(arg) => functions::keys(&self.eval(arg, current, scope)?),
            Node::Length(arg) => functions::length(&self.eval(arg, current, scope)?),
            Node::Lower(arg) => functions::lower(&self.eval(arg, current, scope)?),
            Node::Map(args) => {
                let arg2 = self.eval(&args[1], current, scope)?;
                self.map_array(&arg2, &args[0], scope)
            }
            Node::Max(arg) => functions::array_max(&self.eval(arg, current, scope)?),
            Node::MaxBy(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                self.max_by(&arg1, &args[1], scope)
            }
            Node::Merge(args) => {
                let mut result = HashMap::new();
                for arg in args {
                    let value = self.eval(arg, current, scope)?;

                    match value {
                        Value::Object(o) => result.extend(o),
                        other => {
                            return Err(EvalError::InvalidType {
                                got: other.type_name(),
                                want: "object",
                            })
                        }
                    }
                }

                Ok(Value::Object(result))
            }
            Node::Min(arg) => functions::array_min(&self.eval(arg, current, scope)?),
            Node::MinBy(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                self.min_by(&arg1, &args[1], scope)
            }
            Node::NotNull(args) => {
                for arg in args {
                    let result = self.eval(arg, current, scope)?;

                    if !matches!(result, Value::Null) {
                        return Ok(result);
                    }
                }

                Ok(Value::Null)
            }
            Node::NotNullDefault { argument, default } => {
                let result = self.eval(argument, current, scope)?;

                if !matches!(result, Value::Null) {
                    return Ok(result);
                }

                Ok(default.clone())
            }
            Node::PadLeft(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                functions::pad_left(&arg1, &arg2, &arg3)
            }
            Node::PadRight(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                functions::pad_right(&arg1, &arg2, &arg3)
            }
            Node::PadSpaceLeft(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::pad_space_left(&arg1, &arg2)
            }
            Node::PadSpaceRight(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::pad_space_right(&arg1, &arg2)
            }
            Node::Replace(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                functions::replace(&arg1, &arg2, &arg3)
            }
            Node::ReplaceCount(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                let arg4 = self.eval(&args[3], current, scope)?;
                functions::replace_count(&arg1, &arg2, &arg3, &arg4)
            }
            Node::Reverse(arg) => functions::reverse(&self.eval(arg, current, scope)?),
            Node::Sort(arg) => functions::sort_array(&self.eval(arg, current, scope)?),
            Node::SortBy(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                self.sort_by(&arg1, &args[1], scope)
            }
            Node::Split(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::split(&arg1, &arg2)
            }
            Node::SplitCount(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                let arg3 = self.eval(&args[2], current, scope)?;
                functions::split_count(&arg1, &arg2, &arg3)
            }
            Node::StartsWith(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::starts_with(&arg1, &arg2)
            }
            Node::Sum(arg) => functions::sum(&self.eval(arg, current, scope)?),
            Node::ToArray(arg) => Ok(functions::to_array(&self.eval(arg, current, scope)?)),
            Node::ToNumber(arg) => Ok(functions::to_number(&self.eval(arg, current, scope)?)),
            Node::ToString(arg) => Ok(functions::to_string(&self.eval(arg, current, scope)?)),
            Node::Trim(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::trim(&arg1, &arg2)
            }
            Node::TrimLeft(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::trim_left(&arg1, &arg2)
            }
            Node::TrimRight(args) => {
                let arg1 = self.eval(&args[0], current, scope)?;
                let arg2 = self.eval(&args[1], current, scope)?;
                functions::trim_right(&arg1, &arg2)
            }
            Node::TrimSpace(arg) => functions::trim_space(&self.eval(arg, current, scope)?),
            Node::TrimSpaceLeft(arg) => {
                functions::trim_space_left(&self.eval(arg, current, scope)?)
            }
            Node::TrimSpaceRight(arg) => {
                functions::trim_space_right(&self.eval(arg, current, scope)?)
            }
            Node::Type(arg) => Ok(functions::type_of(&self.eval(arg, current, scope)?)),
            Node::Upper(arg) => functions::upper(&self.eval(arg, current, scope)?),
            Node::Values(arg) => functions::values(&self.eval(arg, current, scope)?),
            Node::Zip(args) => {
                let mut arrays = Vec::with_capacity(args.len());
                let mut count = usize::MAX;
                for arg in args {
                    let value = self.eval(arg, current, scope)?;

                    match value {
                        Value::Array(a) => {
                            count = count.min(a.len());
                            arrays.push(a);
                        }
                        other => {
                            return Err(EvalError::InvalidType {
                                got: other.type_name(),
                                want: "array",
                            })
                        }
                    }
                }

                let mut results = Vec::with_capacity(count);
                for i in 0..count {
                    results.push(Value::Array(
                        arrays.iter().map(|a| a[i].clone()).collect(),
                    ));
                }

                Ok(Value::Array(results))
            }
        }
    }

    fn select_array(
        &self,
        fields: &[Node],
        value: &Value,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let mut results = Vec::with_capacity(fields.len());
        for field in fields {
            results.push(self.eval(field, value, scope)?);
        }

        Ok(Value::Array(results))
    }

    fn select_object(
        &self,
        fields: &[(String, Node)],
        value: &Value,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let mut results = HashMap::with_capacity(fields.len());
        for (key, field) in fields {
            let result = self.eval(field, value, scope)?;
            results.insert(key.clone(), result);
        }

        Ok(Value::Object(results))
    }

    /// Keep the elements for which the filter is truthy. Non-arrays filter
    /// to `Null`.
    fn filter(
        &self,
        value: &Value,
        filter: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => return Ok(Value::Null),
        };

        let mut r = Vec::with_capacity(a.len());
        for v in a {
            let keep = self.eval(filter, v, scope)?;

            if keep.is_truthy() {
                r.push(v.clone());
            }
        }

        Ok(Value::Array(r))
    }

    /// Apply the body to every element, dropping `Null` results. Non-arrays
    /// project to `Null`.
    fn project_array(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => return Ok(Value::Null),
        };

        let mut r = Vec::with_capacity(a.len());
        for v in a {
            let p = self.eval(node, v, scope)?;

            if matches!(p, Value::Null) {
                continue;
            }

            r.push(p);
        }

        Ok(Value::Array(r))
    }

    /// Apply the body to every value of an object, dropping `Null` results.
    /// Non-objects project to `Null`. Output order follows object
    /// iteration order, which is not guaranteed.
    fn project_object(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let o = match value {
            Value::Object(o) => o,
            _ => return Ok(Value::Null),
        };

        let mut r = Vec::with_capacity(o.len());
        for v in o.values() {
            let p = self.eval(node, v, scope)?;

            if matches!(p, Value::Null) {
                continue;
            }

            r.push(p);
        }

        Ok(Value::Array(r))
    }

    fn filter_and_project(
        &self,
        value: &Value,
        filter: &Node,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => return Ok(Value::Null),
        };

        let mut r = Vec::with_capacity(a.len());
        for v in a {
            let keep = self.eval(filter, v, scope)?;

            if !keep.is_truthy() {
                continue;
            }

            let p = self.eval(node, v, scope)?;

            if matches!(p, Value::Null) {
                continue;
            }

            r.push(p);
        }

        Ok(Value::Array(r))
    }

    /// Splice one level of nested arrays while projecting the body over the
    /// spliced elements.
    fn flatten_and_project(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => return Ok(Value::Null),
        };

        let mut r = Vec::with_capacity(a.len());
        for v in a {
            if let Value::Array(inner) = v {
                for i in inner {
                    let p = self.eval(node, i, scope)?;

                    if matches!(p, Value::Null) {
                        continue;
                    }

                    r.push(p);
                }

                continue;
            }

            let p = self.eval(node, v, scope)?;

            if matches!(p, Value::Null) {
                continue;
            }

            r.push(p);
        }

        Ok(Value::Array(r))
    }

    /// Apply an expression to every element. Unlike projections, `Null`
    /// results are preserved.
    fn map_array(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => {
                return Err(EvalError::InvalidType {
                    got: value.type_name(),
                    want: "array",
                })
            }
        };

        let mut r = Vec::with_capacity(a.len());
        for v in a {
            r.push(self.eval(node, v, scope)?);
        }

        Ok(Value::Array(r))
    }

    /// Bucket elements by a string key. Insertion order is preserved within
    /// each bucket.
    fn group_by(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => {
                return Err(EvalError::InvalidType {
                    got: value.type_name(),
                    want: "array",
                })
            }
        };

        if a.is_empty() {
            return Ok(Value::Null);
        }

        let mut groups: HashMap<String, Vec<Value>> = HashMap::with_capacity(a.len());
        for v in a {
            let key = self.eval(node, v, scope)?;

            let key = match key {
                Value::String(s) => s,
                other => {
                    return Err(EvalError::InvalidType {
                        got: other.type_name(),
                        want: "string",
                    })
                }
            };

            groups.entry(key).or_default().push(v.clone());
        }

        Ok(Value::Object(
            groups
                .into_iter()
                .map(|(k, v)| (k, Value::Array(v)))
                .collect(),
        ))
    }

    /// Evaluate the key expression for every element; the first element's
    /// key fixes the comparison kind.
    fn sort_keys(
        &self,
        a: &[Value],
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<SortKeys, EvalError> {
        let first = self.eval(node, &a[0], scope)?;

        if let Value::String(s) = first {
            let mut keys = Vec::with_capacity(a.len());
            keys.push(s);

            for v in &a[1..] {
                let key = self.eval(node, v, scope)?;

                match key {
                    Value::String(s) => keys.push(s),
                    other => {
                        return Err(EvalError::InvalidType {
                            got: other.type_name(),
                            want: "string",
                        })
                    }
                }
            }

            return Ok(SortKeys::Strings(keys));
        }

        let first = first.as_decimal().ok_or(EvalError::InvalidType {
            got: first.type_name(),
            want: "number",
        })?;

        let mut keys = Vec::with_capacity(a.len());
        keys.push(first);

        for v in &a[1..] {
            let key = self.eval(node, v, scope)?;

            let d = key.as_decimal().ok_or(EvalError::InvalidType {
                got: key.type_name(),
                want: "number",
            })?;

            keys.push(d);
        }

        Ok(SortKeys::Numbers(keys))
    }

    fn sort_by(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => {
                return Err(EvalError::InvalidType {
                    got: value.type_name(),
                    want: "array",
                })
            }
        };

        if a.is_empty() {
            return Ok(value.clone());
        }

        match self.sort_keys(a, node, scope)? {
            SortKeys::Strings(keys) => {
                let mut items: Vec<(String, Value)> =
                    keys.into_iter().zip(a.iter().cloned()).collect();
                items.sort_by(|x, y| x.0.cmp(&y.0));
                Ok(Value::Array(items.into_iter().map(|(_, v)| v).collect()))
            }
            SortKeys::Numbers(keys) => {
                let mut items: Vec<(Decimal, Value)> =
                    keys.into_iter().zip(a.iter().cloned()).collect();
                items.sort_by(|x, y| x.0.cmp(&y.0));
                Ok(Value::Array(items.into_iter().map(|(_, v)| v).collect()))
            }
        }
    }

    fn max_by(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => {
                return Err(EvalError::InvalidType {
                    got: value.type_name(),
                    want: "array",
                })
            }
        };

        if a.is_empty() {
            return Ok(Value::Null);
        }

        match self.sort_keys(a, node, scope)? {
            SortKeys::Strings(keys) => {
                let mut best = 0;
                for (i, key) in keys.iter().enumerate().skip(1) {
                    if key > &keys[best] {
                        best = i;
                    }
                }

                Ok(a[best].clone())
            }
            SortKeys::Numbers(keys) => {
                let mut best = 0;
                for (i, key) in keys.iter().enumerate().skip(1) {
                    if key > &keys[best] {
                        best = i;
                    }
                }

                Ok(a[best].clone())
            }
        }
    }

    fn min_by(
        &self,
        value: &Value,
        node: &Node,
        scope: Option<&Scope<'_>>,
    ) -> Result<Value, EvalError> {
        let a = match value {
            Value::Array(a) => a,
            _ => {
                return Err(EvalError::InvalidType {
                    got: value.type_name(),
                    want: "array",
                })
            }
        };

        if a.is_empty() {
            return Ok(Value::Null);
        }

        match self.sort_keys(a, node, scope)? {
            SortKeys::Strings(keys) => {
                let mut best = 0;
                for (i, key) in keys.iter().enumerate().skip(1) {
                    if key < &keys[best] {
                        best = i;
                    }
                }

                Ok(a[best].clone())
            }
            SortKeys::Numbers(keys) => {
                let mut best = 0;
                for (i, key) in keys.iter().enumerate().skip(1) {
                    if key < &keys[best] {
                        best = i;
                    }
                }

                Ok(a[best].clone())
            }
        }
    }
}

enum SortKeys {
    Strings(Vec<String>),
    Numbers(Vec<Decimal>),
}
