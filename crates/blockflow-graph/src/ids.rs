//! Instance id helpers: validity and natural ordering.
//!
//! Everything that orders block ids (ready sets, emission order, reports)
//! uses natural ordering, so `b2` sorts before `b10`.

use std::cmp::Ordering;

/// Words that parse as literals and so cannot name a block.
const RESERVED: &[&str] = &["true", "false", "True", "False"];

/// Whether `id` can name a block instance: an identifier that is not a
/// reserved literal.
pub fn is_valid_block_id(id: &str) -> bool {
    let mut bytes = id.bytes();
    let Some(first) = bytes.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && !RESERVED.contains(&id)
}

/// Splits `s` into alternating runs of digits and non-digits.
fn runs(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(run)
    })
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ordering: digit runs compare by numeric value, everything else
/// lexically. Ties fall back to plain string order so the ordering stays
/// consistent with equality.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let x_digit = x.starts_with(|c: char| c.is_ascii_digit());
                let y_digit = y.starts_with(|c: char| c.is_ascii_digit());
                let ord = match (x_digit, y_digit) {
                    (true, true) => compare_digits(x, y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// A string ordered naturally, for use as a key in ordered collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(pub String);

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorts ids in natural order.
pub fn sort_natural<S: AsRef<str>>(ids: &mut [S]) {
    ids.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_block_id("b1"));
        assert!(is_valid_block_id("_samp_rate"));
        assert!(!is_valid_block_id(""));
        assert!(!is_valid_block_id("1b"));
        assert!(!is_valid_block_id("a-b"));
        assert!(!is_valid_block_id("true"));
    }

    #[test]
    fn test_natural_order() {
        let mut ids = vec!["b10", "b2", "a", "b1", "v10x", "v2x", "b01"];
        sort_natural(&mut ids);
        assert_eq!(ids, vec!["a", "b01", "b1", "b2", "b10", "v2x", "v10x"]);
    }

    #[test]
    fn test_natural_order_is_total() {
        assert_eq!(natural_cmp("b1", "b1"), Ordering::Equal);
        assert_ne!(natural_cmp("b01", "b1"), Ordering::Equal);
        assert_eq!(natural_cmp("b", "b1"), Ordering::Less);
    }
}
