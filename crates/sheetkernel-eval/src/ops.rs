//! Arithmetic, comparison, and concatenation operators (spec §4.C, §7):
//! strict type discipline with numeric coercion for `+ - * / ^ % & = <> < > <= >=`.

use sheetkernel_common::{ExcelError, ExcelErrorKind, LiteralValue};

fn as_number(v: &LiteralValue) -> Result<f64, ExcelError> {
    match v {
        LiteralValue::Int(i) => Ok(*i as f64),
        LiteralValue::Number(n) => Ok(*n),
        LiteralValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        LiteralValue::Empty => Ok(0.0),
        LiteralValue::Error(e) => Err(e.clone()),
        _ => v
            .as_serial_number()
            .ok_or_else(|| ExcelError::new(ExcelErrorKind::Value)),
    }
}

fn wrap_number(n: f64) -> LiteralValue {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        LiteralValue::Int(n as i64)
    } else {
        LiteralValue::Number(n)
    }
}

fn propagate_error(a: &LiteralValue, b: &LiteralValue) -> Option<ExcelError> {
    if let LiteralValue::Error(e) = a {
        return Some(e.clone());
    }
    if let LiteralValue::Error(e) = b {
        return Some(e.clone());
    }
    None
}

pub fn binary_op(op: &str, left: LiteralValue, right: LiteralValue) -> LiteralValue {
    if let Some(e) = propagate_error(&left, &right) {
        return LiteralValue::Error(e);
    }
    match op {
        "+" | "-" | "*" | "/" | "^" => arithmetic(op, &left, &right),
        "=" | "<>" | "<" | ">" | "<=" | ">=" => comparison(op, &left, &right),
        "&" => concat(&left, &right),
        _ => LiteralValue::Error(
            ExcelError::new(ExcelErrorKind::Error).with_message(format!("unknown operator {op}")),
        ),
    }
}

fn arithmetic(op: &str, left: &LiteralValue, right: &LiteralValue) -> LiteralValue {
    let (a, b) = match (as_number(left), as_number(right)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return LiteralValue::Error(e),
    };
    match op {
        "+" => wrap_number(a + b),
        "-" => wrap_number(a - b),
        "*" => wrap_number(a * b),
        "/" => {
            if b == 0.0 {
                LiteralValue::Error(ExcelError::new(ExcelErrorKind::Div))
            } else {
                wrap_number(a / b)
            }
        }
        "^" => {
            let r = a.powf(b);
            if r.is_nan() {
                LiteralValue::Error(ExcelError::new(ExcelErrorKind::Num))
            } else {
                wrap_number(r)
            }
        }
        _ => unreachable!(),
    }
}

pub fn unary_op(op: &str, value: LiteralValue) -> LiteralValue {
    if let LiteralValue::Error(_) = &value {
        return value;
    }
    match op {
        "-" => match as_number(&value) {
            Ok(n) => wrap_number(-n),
            Err(e) => LiteralValue::Error(e),
        },
        "+" => match as_number(&value) {
            Ok(n) => wrap_number(n),
            Err(e) => LiteralValue::Error(e),
        },
        "%" => match as_number(&value) {
            Ok(n) => wrap_number(n / 100.0),
            Err(e) => LiteralValue::Error(e),
        },
        _ => LiteralValue::Error(
            ExcelError::new(ExcelErrorKind::Error)
                .with_message(format!("unknown unary operator {op}")),
        ),
    }
}

fn comparison(op: &str, left: &LiteralValue, right: &LiteralValue) -> LiteralValue {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (LiteralValue::Text(a), LiteralValue::Text(b)) => {
            Some(a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()))
        }
        (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => Some(a.cmp(b)),
        _ => {
            let a = as_number(left);
            let b = as_number(right);
            match (a, b) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
    };

    let Some(ordering) = ordering else {
        // Mismatched, non-numeric-coercible types: only (in)equality are
        // well-defined, and they're always false/true respectively.
        return match op {
            "=" => LiteralValue::Boolean(false),
            "<>" => LiteralValue::Boolean(true),
            _ => LiteralValue::Error(ExcelError::new(ExcelErrorKind::Value)),
        };
    };

    let result = match op {
        "=" => ordering == Ordering::Equal,
        "<>" => ordering != Ordering::Equal,
        "<" => ordering == Ordering::Less,
        ">" => ordering == Ordering::Greater,
        "<=" => ordering != Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        _ => unreachable!(),
    };
    LiteralValue::Boolean(result)
}

fn concat(left: &LiteralValue, right: &LiteralValue) -> LiteralValue {
    LiteralValue::Text(format!("{left}{right}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_coerces_booleans_and_empty() {
        let r = binary_op("+", LiteralValue::Boolean(true), LiteralValue::Empty);
        assert_eq!(r, LiteralValue::Int(1));
    }

    #[test]
    fn division_by_zero_is_div_error() {
        let r = binary_op("/", LiteralValue::Int(1), LiteralValue::Int(0));
        assert!(matches!(r, LiteralValue::Error(e) if e.kind == ExcelErrorKind::Div));
    }

    #[test]
    fn concat_stringifies_numbers() {
        let r = binary_op(
            "&",
            LiteralValue::Text("x=".into()),
            LiteralValue::Int(5),
        );
        assert_eq!(r, LiteralValue::Text("x=5".into()));
    }

    #[test]
    fn comparison_is_case_insensitive_for_text() {
        let r = binary_op(
            "=",
            LiteralValue::Text("Apple".into()),
            LiteralValue::Text("apple".into()),
        );
        assert_eq!(r, LiteralValue::Boolean(true));
    }

    #[test]
    fn error_operand_propagates() {
        let err = ExcelError::new(ExcelErrorKind::Ref);
        let r = binary_op("+", LiteralValue::Error(err.clone()), LiteralValue::Int(1));
        assert_eq!(r, LiteralValue::Error(err));
    }
}
