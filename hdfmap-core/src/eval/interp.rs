//! Tree-walking evaluator over [`Value`] arrays.
//!
//! Arithmetic is element-wise with numpy broadcasting. Booleans promote to
//! integers, integers promote to floats, and true division always yields
//! floats. Integer floor division and modulo follow Python sign rules.

use ndarray::{ArrayD, IxDyn, SliceInfoElem, Zip};

use crate::error::EvalError;
use crate::value::{Selection, Value};

use super::parser::{BinaryOp, Expr, Subscript, UnaryOp};
use super::Scope;

/// Evaluate a parsed expression against `scope`.
pub(crate) fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnresolvedName(name.clone())),
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, scope))
                .collect::<Result<Vec<_>, _>>()?;
            stack(values)
        }
        Expr::Unary(op, operand) => unary(*op, evaluate(operand, scope)?),
        Expr::Binary(op, left, right) => {
            binary(*op, evaluate(left, scope)?, evaluate(right, scope)?)
        }
        Expr::And(left, right) => {
            let left = evaluate(left, scope)?;
            if truthy(&left)? {
                evaluate(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = evaluate(left, scope)?;
            if truthy(&left)? {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call(function, args)
        }
        Expr::Index { target, items } => {
            let target = evaluate(target, scope)?;
            index(&target, items, scope)
        }
    }
}

fn type_error(message: impl Into<String>) -> EvalError {
    EvalError::Type(message.into())
}

/// Python truth value of a value with at most one element.
fn truthy(value: &Value) -> Result<bool, EvalError> {
    match value.size() {
        0 => Ok(false),
        1 => Ok(match value {
            Value::Float(a) => a.iter().any(|v| *v != 0.0),
            Value::Int(a) => a.iter().any(|v| *v != 0),
            Value::Bool(a) => a.iter().any(|v| *v),
            Value::Text(a) => a.iter().any(|v| !v.is_empty()),
        }),
        _ => Err(type_error(
            "the truth value of an array with more than one element is ambiguous",
        )),
    }
}

fn broadcast_shape(left: &[usize], right: &[usize]) -> Result<Vec<usize>, EvalError> {
    let ndim = left.len().max(right.len());
    let mut shape = vec![0; ndim];
    for (n, dim) in shape.iter_mut().enumerate() {
        let l = left.len().checked_sub(ndim - n).map_or(1, |i| left[i]);
        let r = right.len().checked_sub(ndim - n).map_or(1, |i| right[i]);
        *dim = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => {
                return Err(EvalError::Shape {
                    left: left.to_vec(),
                    right: right.to_vec(),
                })
            }
        };
    }
    Ok(shape)
}

fn zip_with<A, B, R, F>(left: &ArrayD<A>, right: &ArrayD<B>, f: F) -> Result<ArrayD<R>, EvalError>
where
    F: Fn(&A, &B) -> R,
{
    let shape = broadcast_shape(left.shape(), right.shape())?;
    let shape_error = || EvalError::Shape {
        left: left.shape().to_vec(),
        right: right.shape().to_vec(),
    };
    let lv = left.broadcast(IxDyn(&shape)).ok_or_else(shape_error)?;
    let rv = right.broadcast(IxDyn(&shape)).ok_or_else(shape_error)?;
    Ok(Zip::from(lv).and(rv).map_collect(|a, b| f(a, b)))
}

/// Numeric operands after promotion to a common kind.
enum Numeric {
    Int(ArrayD<i64>, ArrayD<i64>),
    Float(ArrayD<f64>, ArrayD<f64>),
}

fn as_int(value: &Value) -> Option<ArrayD<i64>> {
    match value {
        Value::Int(a) => Some(a.clone()),
        Value::Bool(a) => Some(a.mapv(i64::from)),
        _ => None,
    }
}

fn promote(left: &Value, right: &Value, op: &str) -> Result<Numeric, EvalError> {
    if let (Some(l), Some(r)) = (as_int(left), as_int(right)) {
        return Ok(Numeric::Int(l, r));
    }
    match (left.to_f64_array(), right.to_f64_array()) {
        (Some(l), Some(r)) => Ok(Numeric::Float(l, r)),
        _ => Err(type_error(format!(
            "unsupported operand types for {op}: '{}' and '{}'",
            left.dtype(),
            right.dtype()
        ))),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::bool(!truthy(&value)?)),
        UnaryOp::Neg => match value {
            Value::Float(a) => Ok(Value::Float(a.mapv(|v| -v))),
            Value::Int(a) => Ok(Value::Int(a.mapv(i64::wrapping_neg))),
            Value::Bool(a) => Ok(Value::Int(a.mapv(|v| -i64::from(v)))),
            Value::Text(_) => Err(type_error("bad operand type for unary -: 'str'")),
        },
        UnaryOp::Pos => match value {
            Value::Bool(a) => Ok(Value::Int(a.mapv(i64::from))),
            Value::Text(_) => Err(type_error("bad operand type for unary +: 'str'")),
            other => Ok(other),
        },
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            compare(op, &left, &right)
        }
        BinaryOp::Add => {
            if let (Value::Text(l), Value::Text(r)) = (&left, &right) {
                return Ok(Value::Text(zip_with(l, r, |a, b| format!("{a}{b}"))?));
            }
            arithmetic(op, &left, &right)
        }
        _ => arithmetic(op, &left, &right),
    }
}

#[allow(clippy::cast_precision_loss)]
fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let symbol = match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
        _ => "**",
    };
    match promote(left, right, symbol)? {
        Numeric::Int(l, r) => match op {
            BinaryOp::Add => Ok(Value::Int(zip_with(&l, &r, |a, b| a.wrapping_add(*b))?)),
            BinaryOp::Sub => Ok(Value::Int(zip_with(&l, &r, |a, b| a.wrapping_sub(*b))?)),
            BinaryOp::Mul => Ok(Value::Int(zip_with(&l, &r, |a, b| a.wrapping_mul(*b))?)),
            BinaryOp::Div => Ok(Value::Float(zip_with(&l, &r, |a, b| *a as f64 / *b as f64)?)),
            BinaryOp::FloorDiv | BinaryOp::Mod => {
                if r.iter().any(|v| *v == 0) {
                    return Err(type_error("integer division or modulo by zero"));
                }
                let f = if op == BinaryOp::FloorDiv { floor_div } else { py_mod };
                Ok(Value::Int(zip_with(&l, &r, |a, b| f(*a, *b))?))
            }
            _ => {
                let exact = zip_with(&l, &r, |a, b| {
                    u32::try_from(*b).ok().and_then(|b| a.checked_pow(b))
                })?;
                if exact.iter().all(Option::is_some) {
                    Ok(Value::Int(exact.mapv(Option::unwrap_or_default)))
                } else {
                    let (l, r) = (l.mapv(|v| v as f64), r.mapv(|v| v as f64));
                    Ok(Value::Float(zip_with(&l, &r, |a, b| a.powf(*b))?))
                }
            }
        },
        Numeric::Float(l, r) => {
            let f: fn(f64, f64) -> f64 = match op {
                BinaryOp::Add => |a, b| a + b,
                BinaryOp::Sub => |a, b| a - b,
                BinaryOp::Mul => |a, b| a * b,
                BinaryOp::Div => |a, b| a / b,
                BinaryOp::FloorDiv => |a, b| (a / b).floor(),
                BinaryOp::Mod => |a, b| {
                    let r = a % b;
                    if r != 0.0 && (r < 0.0) != (b < 0.0) {
                        r + b
                    } else {
                        r
                    }
                },
                _ => f64::powf,
            };
            Ok(Value::Float(zip_with(&l, &r, |a, b| f(*a, *b))?))
        }
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn py_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    fn test<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> bool {
        match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            BinaryOp::Eq => a == b,
            _ => a != b,
        }
    }
    let result = match (left, right) {
        (Value::Text(l), Value::Text(r)) => zip_with(l, r, |a, b| test(op, a, b))?,
        (Value::Text(_), _) | (_, Value::Text(_)) => {
            if !matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
                return Err(type_error(format!(
                    "comparison not supported between '{}' and '{}'",
                    left.dtype(),
                    right.dtype()
                )));
            }
            let shape = broadcast_shape(left.shape(), right.shape())?;
            ArrayD::from_elem(IxDyn(&shape), op == BinaryOp::Ne)
        }
        _ => match promote(left, right, "comparison")? {
            Numeric::Int(l, r) => zip_with(&l, &r, |a, b| test(op, a, b))?,
            Numeric::Float(l, r) => zip_with(&l, &r, |a, b| test(op, a, b))?,
        },
    };
    Ok(Value::Bool(result))
}

fn shaped<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>, EvalError> {
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|e| type_error(e.to_string()))
}

/// Build an array from a list literal of equally shaped values.
fn stack(values: Vec<Value>) -> Result<Value, EvalError> {
    let inner = values.first().map_or_else(Vec::new, |v| v.shape().to_vec());
    if values.iter().any(|v| v.shape() != inner.as_slice()) {
        return Err(type_error("list elements must have the same shape"));
    }
    let mut shape = vec![values.len()];
    shape.extend_from_slice(&inner);
    if values.iter().any(|v| matches!(v, Value::Text(_))) {
        let mut data = Vec::new();
        for value in &values {
            let Value::Text(a) = value else {
                return Err(type_error("cannot mix text and numbers in a list"));
            };
            data.extend(a.iter().cloned());
        }
        return Ok(Value::Text(shaped(&shape, data)?));
    }
    if values.iter().any(|v| matches!(v, Value::Float(_))) {
        let mut data = Vec::new();
        for a in values.iter().filter_map(Value::to_f64_array) {
            data.extend(a.iter().copied());
        }
        return Ok(Value::Float(shaped(&shape, data)?));
    }
    if !values.is_empty() && values.iter().all(|v| matches!(v, Value::Bool(_))) {
        let mut data = Vec::new();
        for value in &values {
            if let Value::Bool(a) = value {
                data.extend(a.iter().copied());
            }
        }
        return Ok(Value::Bool(shaped(&shape, data)?));
    }
    let mut data = Vec::new();
    for a in values.iter().filter_map(as_int) {
        data.extend(a.iter().copied());
    }
    Ok(Value::Int(shaped(&shape, data)?))
}

fn integer_arg(value: &Value, what: &str) -> Result<i64, EvalError> {
    if value.is_scalar() {
        if let Some(v) = value.as_i64() {
            return Ok(v);
        }
    }
    Err(EvalError::Index(format!("{what} must be an integer")))
}

fn index(target: &Value, items: &[Subscript], scope: &Scope) -> Result<Value, EvalError> {
    let shape = target.shape();
    if items.len() > shape.len() {
        return Err(EvalError::Index(format!(
            "too many indices for value with {} dimensions",
            shape.len()
        )));
    }
    let mut elems = Vec::with_capacity(items.len());
    for (axis, item) in items.iter().enumerate() {
        let len = isize::try_from(shape[axis]).map_err(|e| EvalError::Index(e.to_string()))?;
        let bound = |expr: &Option<Expr>| -> Result<Option<isize>, EvalError> {
            expr.as_ref()
                .map(|e| {
                    let v = integer_arg(&evaluate(e, scope)?, "slice bound")?;
                    isize::try_from(v).map_err(|e| EvalError::Index(e.to_string()))
                })
                .transpose()
        };
        match item {
            Subscript::At(expr) => {
                let i = integer_arg(&evaluate(expr, scope)?, "index")?;
                let i = isize::try_from(i).map_err(|e| EvalError::Index(e.to_string()))?;
                let resolved = if i < 0 { i + len } else { i };
                if !(0..len).contains(&resolved) {
                    return Err(EvalError::Index(format!(
                        "index {i} is out of bounds for axis {axis} with size {len}"
                    )));
                }
                elems.push(SliceInfoElem::Index(resolved));
            }
            Subscript::Range { start, end, step } => {
                let step = bound(step)?.unwrap_or(1);
                if step <= 0 {
                    return Err(EvalError::Index("slice step must be positive".into()));
                }
                let clamp = |v: isize| if v < 0 { (v + len).max(0) } else { v.min(len) };
                let start = bound(start)?.map_or(0, clamp);
                let end = bound(end)?.map_or(len, clamp).max(start);
                elems.push(SliceInfoElem::Slice {
                    start,
                    end: Some(end),
                    step,
                });
            }
        }
    }
    target
        .select(&Selection::Slice(elems))
        .map_err(|e| EvalError::Index(e.to_string()))
}

fn expect_args(name: &str, args: &[Value], range: std::ops::RangeInclusive<usize>) -> Result<(), EvalError> {
    if range.contains(&args.len()) {
        Ok(())
    } else {
        Err(type_error(format!(
            "{name}() takes {} argument(s) ({} given)",
            if range.start() == range.end() {
                range.start().to_string()
            } else {
                format!("{} to {}", range.start(), range.end())
            },
            args.len()
        )))
    }
}

fn numeric(name: &str, value: &Value) -> Result<ArrayD<f64>, EvalError> {
    value
        .to_f64_array()
        .ok_or_else(|| type_error(format!("{name}() requires a numeric argument")))
}

fn float_map(name: &str, value: &Value, f: fn(f64) -> f64) -> Result<Value, EvalError> {
    Ok(Value::Float(numeric(name, value)?.mapv(f)))
}

fn extreme(name: &str, args: Vec<Value>, max: bool) -> Result<Value, EvalError> {
    if args.len() > 1 {
        let mut iter = args.into_iter();
        let mut acc = iter.next().unwrap_or_else(|| Value::float(f64::NAN));
        for next in iter {
            let take_next = compare(if max { BinaryOp::Gt } else { BinaryOp::Lt }, &next, &acc)?;
            acc = match (promote(&acc, &next, name)?, take_next) {
                (Numeric::Int(a, b), Value::Bool(m)) => Value::Int(select3(&m, &b, &a)?),
                (Numeric::Float(a, b), Value::Bool(m)) => Value::Float(select3(&m, &b, &a)?),
                _ => return Err(type_error(format!("{name}() requires numeric arguments"))),
            };
        }
        return Ok(acc);
    }
    expect_args(name, &args, 1..=1)?;
    let pick = |a: f64, b: f64| {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else if max {
            a.max(b)
        } else {
            a.min(b)
        }
    };
    if args[0].size() == 0 {
        return Err(type_error(format!(
            "zero-size array to reduction operation {name} which has no identity"
        )));
    }
    if let Some(a) = as_int(&args[0]) {
        let found = if max { a.iter().max() } else { a.iter().min() };
        return Ok(found.map_or_else(|| Value::float(f64::NAN), |v| Value::int(*v)));
    }
    let a = numeric(name, &args[0])?;
    let first = a.iter().next().copied().unwrap_or(f64::NAN);
    Ok(Value::float(a.iter().fold(first, |acc, v| pick(acc, *v))))
}

fn select3<T: Clone>(mask: &ArrayD<bool>, yes: &ArrayD<T>, no: &ArrayD<T>) -> Result<ArrayD<T>, EvalError> {
    let shape = broadcast_shape(yes.shape(), no.shape())?;
    let shape = broadcast_shape(&shape, mask.shape())?;
    let dim = IxDyn(&shape);
    let error = || type_error("cannot broadcast arguments");
    let (m, y, n) = (
        mask.broadcast(dim.clone()).ok_or_else(error)?,
        yes.broadcast(dim.clone()).ok_or_else(error)?,
        no.broadcast(dim).ok_or_else(error)?,
    );
    Ok(Zip::from(m)
        .and(y)
        .and(n)
        .map_collect(|m, y, n| if *m { y.clone() } else { n.clone() }))
}

fn arg_extreme(name: &str, value: &Value, max: bool) -> Result<Value, EvalError> {
    let a = numeric(name, value)?;
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in a.iter().enumerate() {
        let better = match best {
            None => true,
            Some((_, b)) if b.is_nan() => false,
            Some(_) if v.is_nan() => true,
            Some((_, b)) => {
                if max {
                    *v > b
                } else {
                    *v < b
                }
            }
        };
        if better {
            best = Some((i, *v));
        }
    }
    let (i, _) = best.ok_or_else(|| type_error(format!("attempt to get {name} of an empty sequence")))?;
    Ok(Value::int(i64::try_from(i).map_err(|e| type_error(e.to_string()))?))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn call(function: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let name = function
        .strip_prefix("np.")
        .or_else(|| function.strip_prefix("numpy."))
        .unwrap_or(function);
    match name {
        "max" | "amax" => extreme(name, args, true),
        "min" | "amin" => extreme(name, args, false),
        "abs" | "absolute" => {
            expect_args(name, &args, 1..=1)?;
            match &args[0] {
                Value::Float(a) => Ok(Value::Float(a.mapv(f64::abs))),
                Value::Int(a) => Ok(Value::Int(a.mapv(i64::wrapping_abs))),
                Value::Bool(a) => Ok(Value::Int(a.mapv(i64::from))),
                Value::Text(_) => Err(type_error("bad operand type for abs(): 'str'")),
            }
        }
        "sum" => {
            expect_args(name, &args, 1..=1)?;
            if let Some(a) = as_int(&args[0]) {
                return Ok(Value::int(a.iter().fold(0_i64, |acc, v| acc.wrapping_add(*v))));
            }
            Ok(Value::float(numeric(name, &args[0])?.sum()))
        }
        "mean" => {
            expect_args(name, &args, 1..=1)?;
            let a = numeric(name, &args[0])?;
            Ok(Value::float(a.mean().unwrap_or(f64::NAN)))
        }
        "std" => {
            expect_args(name, &args, 1..=1)?;
            let a = numeric(name, &args[0])?;
            if a.is_empty() {
                return Ok(Value::float(f64::NAN));
            }
            Ok(Value::float(a.std(0.0)))
        }
        "argmax" => {
            expect_args(name, &args, 1..=1)?;
            arg_extreme(name, &args[0], true)
        }
        "argmin" => {
            expect_args(name, &args, 1..=1)?;
            arg_extreme(name, &args[0], false)
        }
        "sqrt" | "exp" | "log" | "log10" | "sin" | "cos" | "tan" | "floor" | "ceil" => {
            expect_args(name, &args, 1..=1)?;
            let f: fn(f64) -> f64 = match name {
                "sqrt" => f64::sqrt,
                "exp" => f64::exp,
                "log" => f64::ln,
                "log10" => f64::log10,
                "sin" => f64::sin,
                "cos" => f64::cos,
                "tan" => f64::tan,
                "floor" => f64::floor,
                _ => f64::ceil,
            };
            float_map(name, &args[0], f)
        }
        "round" | "around" => {
            expect_args(name, &args, 1..=2)?;
            let decimals = match args.get(1) {
                Some(d) => integer_arg(d, "decimals").map_err(|_| type_error("decimals must be an integer"))?,
                None => 0,
            };
            if let Some(a) = as_int(&args[0]) {
                if decimals >= 0 {
                    return Ok(Value::Int(a));
                }
            }
            let scale = 10_f64.powi(i32::try_from(decimals).map_err(|e| type_error(e.to_string()))?);
            Ok(Value::Float(
                numeric(name, &args[0])?.mapv(|v| (v * scale).round_ties_even() / scale),
            ))
        }
        "size" => {
            expect_args(name, &args, 1..=1)?;
            Ok(Value::int(i64::try_from(args[0].size()).map_err(|e| type_error(e.to_string()))?))
        }
        "len" => {
            expect_args(name, &args, 1..=1)?;
            let len = match (&args[0], args[0].shape().first()) {
                (_, Some(len)) => *len,
                (Value::Text(_), None) => args[0].as_str().map_or(0, |s| s.chars().count()),
                _ => return Err(type_error("len() of unsized object")),
            };
            Ok(Value::int(i64::try_from(len).map_err(|e| type_error(e.to_string()))?))
        }
        "int" => {
            expect_args(name, &args, 1..=1)?;
            match &args[0] {
                Value::Float(a) => Ok(Value::Int(a.mapv(|v| v.trunc() as i64))),
                Value::Text(a) => {
                    let parsed = a
                        .iter()
                        .map(|s| {
                            s.trim()
                                .parse::<i64>()
                                .map_err(|_| type_error(format!("invalid literal for int(): '{s}'")))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::Int(shaped(a.shape(), parsed)?))
                }
                other => Ok(Value::Int(as_int(other).unwrap_or_default())),
            }
        }
        "float" => {
            expect_args(name, &args, 1..=1)?;
            match &args[0] {
                Value::Text(a) => {
                    let parsed = a
                        .iter()
                        .map(|s| {
                            s.trim().parse::<f64>().map_err(|_| {
                                type_error(format!("could not convert string to float: '{s}'"))
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::Float(shaped(a.shape(), parsed)?))
                }
                other => Ok(Value::Float(numeric(name, other)?)),
            }
        }
        "str" => {
            expect_args(name, &args, 1..=1)?;
            Ok(Value::text(args[0].to_string()))
        }
        _ => Err(EvalError::UnknownFunction(function.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::parser::parse;
    use approx::assert_relative_eq;

    fn scope() -> Scope {
        let mut scope = Scope::new();
        scope.insert("x".into(), Value::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
        scope.insert("y".into(), Value::from(vec![10.0, 20.0, 30.0, 40.0, 50.0]));
        scope.insert("n".into(), Value::from(vec![1_i64, 2, 3]));
        scope.insert("t".into(), Value::float(300.0));
        scope.insert("s".into(), Value::text("abc"));
        scope
    }

    fn eval(input: &str) -> Result<Value, EvalError> {
        evaluate(&parse(input)?, &scope())
    }

    #[test]
    fn test_elementwise_arithmetic() {
        assert_eq!(
            eval("x + y").unwrap(),
            Value::from(vec![11.0, 22.0, 33.0, 44.0, 55.0])
        );
        assert_eq!(eval("n * 2").unwrap(), Value::from(vec![2_i64, 4, 6]));
        assert_eq!(eval("n / 2").unwrap(), Value::from(vec![0.5, 1.0, 1.5]));
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), Value::int(512));
        assert_eq!(eval("2 ** -1").unwrap(), Value::float(0.5));
        assert_eq!(eval("2 ** 64").unwrap(), Value::float(2.0_f64.powi(64)));
    }

    #[test]
    fn test_python_division_rules() {
        assert_eq!(eval("-7 // 2").unwrap(), Value::int(-4));
        assert_eq!(eval("-7 % 3").unwrap(), Value::int(2));
        assert_eq!(eval("7.5 // 2").unwrap(), Value::float(3.0));
        assert!(matches!(eval("1 // 0"), Err(EvalError::Type(_))));
        assert_eq!(eval("1 / 0").unwrap(), Value::float(f64::INFINITY));
    }

    #[test]
    fn test_broadcast_mismatch() {
        assert!(matches!(eval("x + n"), Err(EvalError::Shape { .. })));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("np.max(x)").unwrap(), Value::float(5.0));
        assert_eq!(eval("max(n)").unwrap(), Value::int(3));
        assert_eq!(eval("max(1, 2.5)").unwrap(), Value::float(2.5));
        assert_eq!(eval("sum(n)").unwrap(), Value::int(6));
        assert_eq!(eval("np.argmax(y)").unwrap(), Value::int(4));
        assert_eq!(eval("len(x)").unwrap(), Value::int(5));
        assert_eq!(eval("int(t / 7)").unwrap(), Value::int(42));
        assert_eq!(eval("round(2.5)").unwrap(), Value::float(2.0));
        assert_eq!(eval("str(t)").unwrap(), Value::text("300.0"));
        let mean = eval("mean(x)").unwrap().as_f64().unwrap();
        assert_relative_eq!(mean, 3.0);
        let std = eval("np.std(x)").unwrap().as_f64().unwrap();
        assert_relative_eq!(std, 2.0_f64.sqrt(), epsilon = 1e-12);
        let pi = eval("np.pi * 2").unwrap().as_f64().unwrap();
        assert_relative_eq!(pi, std::f64::consts::TAU);
        assert!(matches!(eval("frobnicate(x)"), Err(EvalError::UnknownFunction(f)) if f == "frobnicate"));
    }

    #[test]
    fn test_indexing() {
        assert_eq!(eval("x[0]").unwrap(), Value::float(1.0));
        assert_eq!(eval("x[-1]").unwrap(), Value::float(5.0));
        assert_eq!(eval("x[1:3]").unwrap(), Value::from(vec![2.0, 3.0]));
        assert_eq!(eval("x[::2]").unwrap(), Value::from(vec![1.0, 3.0, 5.0]));
        assert_eq!(eval("x[3:100]").unwrap(), Value::from(vec![4.0, 5.0]));
        assert_eq!(eval("x[len(x)//2]").unwrap(), Value::float(3.0));
        assert!(matches!(eval("x[5]"), Err(EvalError::Index(_))));
        assert!(matches!(eval("t[0]"), Err(EvalError::Index(_))));
        assert!(matches!(eval("x[1.0]"), Err(EvalError::Index(_))));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("t > 200 and t < 400").unwrap(), Value::bool(true));
        assert_eq!(eval("not t").unwrap(), Value::bool(false));
        assert_eq!(eval("s == 'abc'").unwrap(), Value::bool(true));
        assert_eq!(eval("s + 'd'").unwrap(), Value::text("abcd"));
        assert!(matches!(eval("x > 2 or t"), Err(EvalError::Type(_))));
        assert!(matches!(eval("s - 1"), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_list_literal() {
        assert_eq!(eval("[1, 2.5]").unwrap(), Value::from(vec![1.0, 2.5]));
        assert_eq!(eval("sum([1, 2, 3])").unwrap(), Value::int(6));
    }

    #[test]
    fn test_unresolved_name() {
        assert_eq!(
            eval("x + missing").unwrap_err(),
            EvalError::UnresolvedName("missing".into())
        );
    }
}
