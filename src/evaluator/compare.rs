use crate::config::Operator;
use crate::error::EvaluationError;
use crate::value::values_equal;
use serde_json::Value;
use std::cmp::Ordering;

/// Applies `operator` as `left <op> right`, where `left` is the live value
/// from `info` and `right` the value written in the condition.
pub(super) fn apply(operator: Operator, left: &Value, right: &Value) -> Result<bool, EvaluationError> {
    match operator {
        Operator::Equal => Ok(values_equal(left, right)),
        Operator::NotEqual => Ok(!values_equal(left, right)),
        Operator::GreaterThan => compare(operator, left, right).map(Ordering::is_gt),
        Operator::GreaterThanOrEqual => compare(operator, left, right).map(Ordering::is_ge),
        Operator::LessThan => compare(operator, left, right).map(Ordering::is_lt),
        Operator::LessThanOrEqual => compare(operator, left, right).map(Ordering::is_le),
        Operator::In => contains(operator, right, left),
        Operator::NotIn => contains(operator, right, left).map(|found| !found),
    }
}

fn mismatch(operator: Operator, left: &Value, right: &Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operator: operator.symbol().to_string(),
        left: left.clone(),
        right: right.clone(),
    }
}

/// Numbers order numerically, strings lexically; nothing else is ordered.
fn compare(operator: Operator, left: &Value, right: &Value) -> Result<Ordering, EvaluationError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l
                .partial_cmp(&r)
                .ok_or_else(|| mismatch(operator, left, right)),
            _ => Err(mismatch(operator, left, right)),
        },
        (Value::String(l), Value::String(r)) => Ok(l.cmp(r)),
        _ => Err(mismatch(operator, left, right)),
    }
}

/// Membership of `element` in `container`: array elements, substrings of a
/// string, or keys of an object.
fn contains(operator: Operator, container: &Value, element: &Value) -> Result<bool, EvaluationError> {
    match (container, element) {
        (Value::Array(items), _) => Ok(items.iter().any(|item| values_equal(item, element))),
        (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(mismatch(operator, element, container)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ordering_operators_on_numbers_and_strings() {
        assert!(apply(Operator::GreaterThan, &json!(7), &json!(5)).unwrap());
        assert!(apply(Operator::GreaterThanOrEqual, &json!(5.0), &json!(5)).unwrap());
        assert!(!apply(Operator::LessThan, &json!(5), &json!(5)).unwrap());
        assert!(apply(Operator::LessThanOrEqual, &json!("apple"), &json!("banana")).unwrap());
    }

    #[test]
    fn ordering_incomparable_values_is_a_mismatch() {
        let err = apply(Operator::GreaterThan, &json!("7"), &json!(5)).unwrap_err();
        assert!(matches!(err, EvaluationError::TypeMismatch { .. }));
        assert!(apply(Operator::LessThan, &json!(null), &json!(1)).is_err());
    }

    #[test]
    fn membership_checks_the_info_value_inside_the_condition_value() {
        assert!(apply(Operator::In, &json!("easy"), &json!(["easy", "medium"])).unwrap());
        assert!(!apply(Operator::In, &json!("hard"), &json!(["easy", "medium"])).unwrap());
        assert!(apply(Operator::NotIn, &json!(3), &json!([1, 2])).unwrap());
        assert!(apply(Operator::In, &json!("cat"), &json!("concatenate")).unwrap());
        assert!(apply(Operator::In, &json!("a"), &json!({"a": 1})).unwrap());
    }

    #[test]
    fn membership_in_a_scalar_is_a_mismatch() {
        let err = apply(Operator::In, &json!("a"), &json!(5)).unwrap_err();
        match err {
            EvaluationError::TypeMismatch { operator, left, right } => {
                assert_eq!(operator, "in");
                assert_eq!(left, json!("a"));
                assert_eq!(right, json!(5));
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }
}
