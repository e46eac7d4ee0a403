//! Module: normalize
//! Responsibility: literal arguments to typed values, plus operator arity.
//! Does not own: case folding or pattern detection (compiler/backend concern).
//! Boundary: every comparison's arguments pass through here exactly once.

use crate::{
    ast::ComparisonOperator,
    error::FilterError,
    value::{Value, ValueType},
};

/// Literal recognised as the null sentinel by the null-check operators.
pub const NULL_LITERAL: &str = "null";

/// Normalize the arguments of one comparison against its target type.
pub fn normalize(
    selector: &str,
    operator: ComparisonOperator,
    arguments: &[String],
    target: &ValueType,
) -> Result<Vec<Value>, FilterError> {
    check_arity(selector, operator, arguments)?;

    if operator.is_null_check() {
        return match arguments {
            [literal] if literal.eq_ignore_ascii_case(NULL_LITERAL) => Ok(vec![Value::Null]),
            _ => Err(FilterError::syntax(format!(
                "operator '{operator}' on '{selector}' only accepts the value 'null'"
            ))),
        };
    }

    let values = arguments
        .iter()
        .map(|literal| normalize_literal(selector, literal, target))
        .collect::<Result<Vec<_>, _>>()?;

    if operator.is_ordering()
        && let Some(value) = values.iter().find(|value| value.as_text().is_none())
    {
        return Err(FilterError::syntax(format!(
            "operator '{operator}' on '{selector}' cannot order a {} value",
            value.type_label()
        )));
    }

    Ok(values)
}

fn check_arity(
    selector: &str,
    operator: ComparisonOperator,
    arguments: &[String],
) -> Result<(), FilterError> {
    if arguments.is_empty() {
        return Err(FilterError::syntax(format!(
            "operator '{operator}' on '{selector}': values must not be empty"
        )));
    }

    if !operator.is_multi_value() && arguments.len() != 1 {
        return Err(FilterError::syntax(format!(
            "operator '{operator}' on '{selector}' shall have exactly one value, got {}",
            arguments.len()
        )));
    }

    Ok(())
}

fn normalize_literal(
    selector: &str,
    literal: &str,
    target: &ValueType,
) -> Result<Value, FilterError> {
    match target {
        ValueType::Symbol(set) => set.find(literal).map(Value::symbol).ok_or_else(|| {
            tracing::debug!(selector, literal, set = set.name(), "unmatched symbol literal");
            FilterError::value_coercion(
                selector,
                literal,
                format!("not a {} value", set.name()),
                set.symbols().iter().map(|s| s.to_ascii_lowercase()).collect(),
            )
        }),
        ValueType::Boolean => match literal {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(FilterError::value_coercion(
                selector,
                literal,
                "expected a boolean",
                vec!["true".to_string(), "false".to_string()],
            )),
        },
        ValueType::Text | ValueType::Integer => Ok(Value::text(literal)),
    }
}
