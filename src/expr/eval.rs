//! Tree-walking interpreter for parsed expressions

use std::cmp::Ordering;

use crate::model::{Row, Value};

use super::ast::{BinaryOp, Expr, Function, UnaryOp};

/// Evaluate an expression against one row.
///
/// Errors are row-local messages: a referenced column missing from this row,
/// a type mismatch between operator and operand, or an arithmetic failure.
pub fn evaluate(expr: &Expr, row: &Row) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(name) => row
            .get(name)
            .cloned()
            .ok_or_else(|| format!("column '{}' is missing in this row", name)),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, row)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => negate(&value),
            }
        }
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            if !evaluate(left, row)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(evaluate(right, row)?.is_truthy()))
        }
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            if evaluate(left, row)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(evaluate(right, row)?.is_truthy()))
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, row)?;
            let right = evaluate(right, row)?;
            binary(*op, &left, &right)
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, row))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &args)
        }
    }
}

fn type_error(op: &str, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operand types for {}: {} and {}",
        op,
        left.type_name(),
        right.type_name()
    )
}

fn finite(f: f64) -> Result<Value, String> {
    if f.is_finite() {
        Ok(Value::Float(f))
    } else {
        Err("numeric result out of range".to_string())
    }
}

fn overflow() -> String {
    "integer overflow".to_string()
}

fn negate(value: &Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(format!("bad operand type for unary -: {}", other.type_name())),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, left, right)
        }
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right).ok_or_else(|| {
                format!(
                    "'{}' not supported between {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                )
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in evaluate"),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    match (left, right) {
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (Value::Int(a), Value::Int(b)) if op != BinaryOp::Div => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(type_error(op.symbol(), left, right));
            };
            match op {
                BinaryOp::Add => finite(a + b),
                BinaryOp::Sub => finite(a - b),
                BinaryOp::Mul => finite(a * b),
                _ => {
                    if b == 0.0 {
                        Err("division by zero".to_string())
                    } else {
                        finite(a / b)
                    }
                }
            }
        }
    }
}

/// Equality across types: numbers compare by value, other mismatched types
/// are simply unequal.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(_), Some(_)) => compare(left, right) == Some(Ordering::Equal),
        _ => left == right,
    }
}

/// Ordering between comparable values; `None` for mismatched types
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

fn number_arg(function: Function, value: &Value) -> Result<f64, String> {
    value.as_f64().ok_or_else(|| {
        format!(
            "{}() expects a number, got {}",
            function.name(),
            value.type_name()
        )
    })
}

/// Turn an integral float into an `Int` when it fits
fn integral(f: f64) -> Result<Value, String> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Value::Int(f as i64))
    } else {
        finite(f)
    }
}

fn call(function: Function, args: &[Value]) -> Result<Value, String> {
    match function {
        Function::Abs => match &args[0] {
            Value::Int(i) => i.checked_abs().map(Value::Int).ok_or_else(overflow),
            other => Ok(Value::Float(number_arg(function, other)?.abs())),
        },
        Function::Floor => match &args[0] {
            Value::Int(i) => Ok(Value::Int(*i)),
            other => integral(number_arg(function, other)?.floor()),
        },
        Function::Ceil => match &args[0] {
            Value::Int(i) => Ok(Value::Int(*i)),
            other => integral(number_arg(function, other)?.ceil()),
        },
        Function::Round => round(args),
        Function::Sqrt => {
            let x = number_arg(function, &args[0])?;
            if x < 0.0 {
                Err("math domain error in sqrt()".to_string())
            } else {
                Ok(Value::Float(x.sqrt()))
            }
        }
        Function::Pow => match (&args[0], &args[1]) {
            (Value::Int(base), Value::Int(exp)) if *exp >= 0 => u32::try_from(*exp)
                .ok()
                .and_then(|exp| base.checked_pow(exp))
                .map(Value::Int)
                .ok_or_else(overflow),
            (base, exp) => {
                let base = number_arg(function, base)?;
                let exp = number_arg(function, exp)?;
                if base == 0.0 && exp < 0.0 {
                    return Err("division by zero in pow()".to_string());
                }
                let result = base.powf(exp);
                if result.is_nan() {
                    Err("math domain error in pow()".to_string())
                } else {
                    finite(result)
                }
            }
        },
        Function::Min | Function::Max => {
            let wanted = if function == Function::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best = &args[0];
            for candidate in &args[1..] {
                let ordering = compare(candidate, best).ok_or_else(|| {
                    format!(
                        "{}() cannot compare {} and {}",
                        function.name(),
                        candidate.type_name(),
                        best.type_name()
                    )
                })?;
                if ordering == wanted {
                    best = candidate;
                }
            }
            Ok(best.clone())
        }
    }
}

/// Round half to even, like Python's `round`. Without a digit count the
/// result is an integer.
fn round(args: &[Value]) -> Result<Value, String> {
    let digits = match args.get(1) {
        None => None,
        Some(Value::Int(d)) => Some(*d),
        Some(other) => {
            return Err(format!(
                "round() digits must be an integer, got {}",
                other.type_name()
            ))
        }
    };

    match (&args[0], digits) {
        (Value::Int(i), None) => Ok(Value::Int(*i)),
        (Value::Int(i), Some(d)) if d >= 0 => Ok(Value::Int(*i)),
        (value, None) => integral(number_arg(Function::Round, value)?.round_ties_even()),
        (value, Some(d)) => {
            let x = number_arg(Function::Round, value)?;
            let factor = 10f64.powi(d.clamp(-308, 308) as i32);
            let rounded = (x * factor).round_ties_even() / factor;
            if rounded.is_finite() {
                Ok(Value::Float(rounded))
            } else {
                Ok(Value::Float(x))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;

    fn row(json: &str) -> Row {
        serde_json::from_str(json).unwrap()
    }

    fn eval(source: &str, json: &str) -> Result<Value, String> {
        evaluate(&parse(source).unwrap(), &row(json))
    }

    #[test]
    fn test_integer_and_float_arithmetic() {
        assert_eq!(eval("a + b", r#"{"a":1,"b":2}"#), Ok(Value::Int(3)));
        assert_eq!(eval("a * 1.5", r#"{"a":2}"#), Ok(Value::Float(3.0)));
        assert_eq!(eval("a / 2", r#"{"a":3}"#), Ok(Value::Float(1.5)));
        assert_eq!(eval("-(a - 10)", r#"{"a":3}"#), Ok(Value::Int(7)));
    }

    #[test]
    fn test_string_operand_is_type_error() {
        let err = eval("a + b", r#"{"a":"x","b":1}"#).unwrap_err();
        assert_eq!(err, "unsupported operand types for +: string and integer");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            eval("first + ' ' + last", r#"{"first":"Ada","last":"Lovelace"}"#),
            Ok(Value::from("Ada Lovelace"))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("a / b", r#"{"a":1,"b":0}"#), Err("division by zero".to_string()));
        assert_eq!(eval("a / b", r#"{"a":1,"b":0.0}"#), Err("division by zero".to_string()));
    }

    #[test]
    fn test_missing_column_and_null() {
        assert_eq!(
            eval("a + b", r#"{"a":1}"#),
            Err("column 'b' is missing in this row".to_string())
        );
        assert!(eval("a + 1", r#"{"a":null}"#).is_err());
        assert_eq!(eval("a == null", r#"{"a":null}"#), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("a >= 2.0", r#"{"a":2}"#), Ok(Value::Bool(true)));
        assert_eq!(eval("a == 'x'", r#"{"a":1}"#), Ok(Value::Bool(false)));
        assert!(eval("a < 'x'", r#"{"a":1}"#).is_err());
        assert_eq!(
            eval("a > 1 and b or not c", r#"{"a":2,"b":"","c":0}"#),
            Ok(Value::Bool(true))
        );
        // Short-circuit skips the failing right-hand side
        assert_eq!(eval("false and a / 0", r#"{"a":1}"#), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("abs(a)", r#"{"a":-4}"#), Ok(Value::Int(4)));
        assert_eq!(eval("round(2.5)", "{}"), Ok(Value::Int(2)));
        assert_eq!(eval("round(a, 2)", r#"{"a":3.14159}"#), Ok(Value::Float(3.14)));
        assert_eq!(eval("floor(-1.5)", "{}"), Ok(Value::Int(-2)));
        assert_eq!(eval("ceil(1.2)", "{}"), Ok(Value::Int(2)));
        assert_eq!(eval("sqrt(16)", "{}"), Ok(Value::Float(4.0)));
        assert!(eval("sqrt(-1)", "{}").is_err());
        assert_eq!(eval("pow(2, 10)", "{}"), Ok(Value::Int(1024)));
        assert_eq!(eval("pow(4, 0.5)", "{}"), Ok(Value::Float(2.0)));
        assert_eq!(eval("max(a, b, 3)", r#"{"a":1,"b":7.5}"#), Ok(Value::Float(7.5)));
        assert_eq!(eval("min('b', 'a')", "{}"), Ok(Value::from("a")));
        assert!(eval("min(1, 'a')", "{}").is_err());
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(
            eval("a * a", r#"{"a":9223372036854775807}"#),
            Err("integer overflow".to_string())
        );
    }
}
