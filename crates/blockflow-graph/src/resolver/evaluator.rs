//! Memoized expression evaluation against a namespace.

use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use blockflow_core::expr::{self, Expr};
use blockflow_core::{EvalError, ExprError, Scope, Value};

/// Values of the evaluatable blocks resolved so far, keyed by block id.
///
/// Carries an order-independent fingerprint of its contents so evaluation
/// results can be memoized per namespace state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    values: BTreeMap<String, Value>,
    fingerprint: u64,
}

fn entry_hash(id: &str, value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `id` to `value`, replacing any previous binding.
    pub fn insert(&mut self, id: impl Into<String>, value: Value) {
        let id = id.into();
        self.fingerprint ^= entry_hash(&id, &value);
        if let Some(old) = self.values.insert(id.clone(), value) {
            self.fingerprint ^= entry_hash(&id, &old);
        }
    }

    /// The value bound to `id`.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bindings in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Hash of the current bindings. Equal contents give equal fingerprints
    /// regardless of insertion order.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl Scope for Namespace {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Expression evaluator with two caches.
///
/// Parsed trees are kept by expression text for the evaluator's lifetime.
/// Results are memoized by `(expression, namespace fingerprint)`; that memo
/// must be cleared whenever the graph changes, which the resolution cache
/// does at the start of every pass.
#[derive(Debug, Default)]
pub struct Evaluator {
    asts: HashMap<String, Result<Arc<Expr>, ExprError>>,
    memo: HashMap<(String, u64), Result<Value, EvalError>>,
}

impl Evaluator {
    /// Creates an evaluator with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `expression` with identifiers bound by `namespace`.
    pub fn evaluate(&mut self, expression: &str, namespace: &Namespace) -> Result<Value, EvalError> {
        let key = (expression.to_string(), namespace.fingerprint());
        if let Some(result) = self.memo.get(&key) {
            return result.clone();
        }
        let result = self
            .parse(expression)
            .map_err(EvalError::from)
            .and_then(|ast| expr::evaluate(&ast, namespace));
        self.memo.insert(key, result.clone());
        result
    }

    fn parse(&mut self, expression: &str) -> Result<Arc<Expr>, ExprError> {
        if let Some(cached) = self.asts.get(expression) {
            return cached.clone();
        }
        let parsed = expr::parse(expression).map(Arc::new);
        self.asts.insert(expression.to_string(), parsed.clone());
        parsed
    }

    /// Drops every memoized result. Parsed trees are kept.
    pub fn clear_memo(&mut self) {
        self.memo.clear();
    }

    /// Number of memoized results.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Number of distinct expressions parsed so far.
    pub fn parsed_len(&self) -> usize {
        self.asts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let mut a = Namespace::new();
        a.insert("x", Value::Number(1.0));
        a.insert("y", Value::from("s"));
        let mut b = Namespace::new();
        b.insert("y", Value::from("s"));
        b.insert("x", Value::Number(1.0));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), Namespace::new().fingerprint());
    }

    #[test]
    fn test_rebinding_updates_fingerprint() {
        let mut ns = Namespace::new();
        ns.insert("x", Value::Number(1.0));
        let before = ns.fingerprint();
        ns.insert("x", Value::Number(2.0));
        assert_ne!(ns.fingerprint(), before);
        ns.insert("x", Value::Number(1.0));
        assert_eq!(ns.fingerprint(), before);
    }

    #[test]
    fn test_memo_is_keyed_by_namespace() {
        let mut eval = Evaluator::new();
        let mut ns = Namespace::new();
        ns.insert("x", Value::Number(1.0));
        assert_eq!(eval.evaluate("x + 1", &ns).unwrap(), Value::Number(2.0));
        ns.insert("x", Value::Number(5.0));
        assert_eq!(eval.evaluate("x + 1", &ns).unwrap(), Value::Number(6.0));
        assert_eq!(eval.memo_len(), 2);
        assert_eq!(eval.parsed_len(), 1);
    }

    #[test]
    fn test_clear_memo_keeps_parsed_trees() {
        let mut eval = Evaluator::new();
        let ns = Namespace::new();
        eval.evaluate("1 + 1", &ns).unwrap();
        eval.clear_memo();
        assert_eq!(eval.memo_len(), 0);
        assert_eq!(eval.parsed_len(), 1);
    }

    #[test]
    fn test_errors_are_cached_too() {
        let mut eval = Evaluator::new();
        let ns = Namespace::new();
        let err = eval.evaluate("missing * 2", &ns).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnknownIdentifier {
                name: "missing".into()
            }
        );
        assert_eq!(eval.evaluate("missing * 2", &ns).unwrap_err(), err);
        assert!(matches!(eval.evaluate("1 +", &ns), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_escaped_multibyte_character() {
        let mut eval = Evaluator::new();
        let mut ns = Namespace::new();
        ns.insert("v1", Value::from("!"));
        assert_eq!(
            eval.evaluate(r"'caf\é' + v1", &ns).unwrap(),
            Value::from("café!")
        );
    }
}
