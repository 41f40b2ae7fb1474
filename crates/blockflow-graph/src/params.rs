//! Parameter evaluation and type conformance.

use std::collections::BTreeMap;

use blockflow_core::{EvalError, ParamDefinition, ParamType, Value};
use thiserror::Error;

use crate::graph::BlockInstance;
use crate::ids::is_valid_block_id;
use crate::resolver::{Evaluator, Namespace, Resolution};

/// Why one parameter has no usable value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// The expression did not evaluate.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The expression evaluated to a value of the wrong type.
    #[error("expected {expected}, got {value}")]
    WrongType {
        /// Declared type.
        expected: ParamType,
        /// What the expression produced.
        value: Value,
    },

    /// An enumerated parameter set to something other than an option key.
    #[error("'{key}' is not one of the options")]
    NotAnOption {
        /// The value as written.
        key: String,
    },

    /// An identifier parameter that is not an identifier.
    #[error("'{value}' is not a valid identifier")]
    InvalidId {
        /// The value as written.
        value: String,
    },
}

/// Evaluated parameters of one block instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamValues {
    /// Raw expressions for every declared parameter.
    pub expressions: BTreeMap<String, String>,
    /// Values that evaluated and conform to their declared type.
    pub values: BTreeMap<String, Value>,
    /// Parameters that failed, by id.
    pub errors: BTreeMap<String, ParamError>,
}

impl ParamValues {
    /// The value of one parameter.
    pub fn get(&self, param: &str) -> Option<&Value> {
        self.values.get(param)
    }

    /// Returns true when every parameter has a value.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Computes a parameter's value without checking its type.
///
/// Evaluated types go through the evaluator; strings and identifiers are
/// taken verbatim, enum keys trimmed. A missing definition evaluates the
/// expression as `raw`.
pub(crate) fn raw_value(
    param: Option<&ParamDefinition>,
    expression: &str,
    evaluator: &mut Evaluator,
    namespace: &Namespace,
) -> Result<Value, EvalError> {
    match param.map_or(ParamType::Raw, |p| p.dtype) {
        ParamType::String | ParamType::Id => Ok(Value::Str(expression.to_string())),
        ParamType::Enum => Ok(Value::Str(expression.trim().to_string())),
        _ => evaluator.evaluate(expression, namespace),
    }
}

fn integral(value: &Value) -> bool {
    value.as_integer().is_some()
}

/// Checks a computed value against its declared type.
pub(crate) fn conform(param: &ParamDefinition, value: Value) -> Result<Value, ParamError> {
    let ok = match param.dtype {
        ParamType::Raw | ParamType::String => true,
        ParamType::Int => integral(&value),
        ParamType::Real => value.as_number().is_some(),
        ParamType::Bool => matches!(value, Value::Bool(_)),
        ParamType::RealVector => value.is_numeric_list(),
        ParamType::IntVector => matches!(&value, Value::List(items) if items.iter().all(integral)),
        ParamType::Enum => {
            let key = value.as_str().unwrap_or_default();
            if param.option(key).is_none() {
                return Err(ParamError::NotAnOption {
                    key: key.to_string(),
                });
            }
            true
        }
        ParamType::Id => {
            let text = value.as_str().unwrap_or_default().trim();
            if !is_valid_block_id(text) {
                return Err(ParamError::InvalidId {
                    value: text.to_string(),
                });
            }
            return Ok(Value::Str(text.to_string()));
        }
    };
    if ok {
        Ok(value)
    } else {
        Err(ParamError::WrongType {
            expected: param.dtype,
            value,
        })
    }
}

/// Evaluates every declared parameter of `block`.
///
/// The value parameter of an evaluatable block is taken from the resolution
/// instead of being evaluated again. When that block sits on a cycle it has
/// neither a value nor an error; the cycle is reported on its own.
pub(crate) fn evaluate_block(
    block: &BlockInstance,
    resolution: &Resolution,
    evaluator: &mut Evaluator,
) -> ParamValues {
    let definition = block.definition();
    let mut out = ParamValues::default();

    for param in &definition.params {
        let expression = block.param(&param.id).unwrap_or(param.default.as_str());
        out.expressions
            .insert(param.id.clone(), expression.to_string());

        let computed = if definition.evaluatable && param.id == definition.value_param {
            match (resolution.value(block.id()), resolution.failure(block.id())) {
                (Some(value), _) => Ok(value.clone()),
                (None, Some(err)) => Err(err.clone()),
                (None, None) => continue,
            }
        } else {
            raw_value(Some(param), expression, evaluator, resolution.namespace())
        };

        match computed.map_err(ParamError::from).and_then(|v| conform(param, v)) {
            Ok(value) => {
                out.values.insert(param.id.clone(), value);
            }
            Err(err) => {
                out.errors.insert(param.id.clone(), err);
            }
        }
    }
    out
}
