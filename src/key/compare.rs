//! Key Comparator Module
//!
//! Implements the pluggable equality tests used to match cache keys.
//!
//! Lookup is always a linear scan driven by one of these comparators; no
//! hashing step is ever involved. Introducing a hash map here would change
//! the equality semantics (NaN, pointer identity of composites), so the O(n)
//! scan is a deliberate design decision; n is bounded by the configured
//! maximum cache size.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::key::{Arg, Element};

// == Key Comparator ==
/// Equality strategy between two cache keys.
///
/// Every comparator is total and reflexive: each key is equal to itself and
/// any two keys can be compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyComparator {
    /// Positional same-value-zero equality; composites by pointer identity
    #[default]
    Shallow,
    /// Recursive structural equality over lists, maps, and elements
    Deep,
    /// Compares only the first element of each key, treating
    /// [`Element`] values specially (identity fields plus a shallow
    /// property diff); used by the component adapter
    SingleElement,
}

impl KeyComparator {
    // == Keys Equal ==
    /// Tests whether two keys address the same cache entry.
    pub fn keys_equal(&self, a: &[Arg], b: &[Arg]) -> bool {
        match self {
            KeyComparator::Shallow => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| shallow_equal(x, y))
            }
            KeyComparator::Deep => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
            }
            KeyComparator::SingleElement => match (a.first(), b.first()) {
                (Some(x), Some(y)) => single_element_equal(x, y),
                (None, None) => true,
                _ => false,
            },
        }
    }
}

// == Shallow Equality ==
/// Same-value-zero equality for one argument position.
///
/// Floats compare `NaN` equal to `NaN` and `+0` equal to `-0`; composite
/// values compare by pointer identity only.
fn shallow_equal(a: &Arg, b: &Arg) -> bool {
    match (a, b) {
        (Arg::Null, Arg::Null) => true,
        (Arg::Bool(x), Arg::Bool(y)) => x == y,
        (Arg::Int(x), Arg::Int(y)) => x == y,
        (Arg::Float(x), Arg::Float(y)) => float_equal(*x, *y),
        (Arg::Str(x), Arg::Str(y)) => x == y,
        (Arg::List(x), Arg::List(y)) => Arc::ptr_eq(x, y),
        (Arg::Map(x), Arg::Map(y)) => Arc::ptr_eq(x, y),
        (Arg::Element(x), Arg::Element(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

// == Deep Equality ==
/// Recursive structural equality for one argument position.
///
/// Pointer-identical composites short-circuit to equal; otherwise lists,
/// maps, and elements are compared member by member, with same-value-zero
/// float semantics throughout.
fn deep_equal(a: &Arg, b: &Arg) -> bool {
    match (a, b) {
        (Arg::List(x), Arg::List(y)) => {
            Arc::ptr_eq(x, y)
                || (x.len() == y.len() && x.iter().zip(y.iter()).all(|(m, n)| deep_equal(m, n)))
        }
        (Arg::Map(x), Arg::Map(y)) => Arc::ptr_eq(x, y) || maps_deep_equal(x, y),
        (Arg::Element(x), Arg::Element(y)) => {
            Arc::ptr_eq(x, y)
                || (x.kind == y.kind && x.id == y.id && maps_deep_equal(&x.props, &y.props))
        }
        _ => shallow_equal(a, b),
    }
}

fn maps_deep_equal(a: &BTreeMap<String, Arg>, b: &BTreeMap<String, Arg>) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && deep_equal(va, vb))
}

// == Single-Element Equality ==
/// Type-aware comparison of the leading argument of each key.
///
/// Two elements match when their kinds and stable identity fields agree and
/// a shallow diff of their property bags finds no difference. Non-element
/// values fall back to the shallow rules.
fn single_element_equal(a: &Arg, b: &Arg) -> bool {
    match (a.as_element(), b.as_element()) {
        (Some(x), Some(y)) => elements_equal(x, y),
        _ => shallow_equal(a, b),
    }
}

fn elements_equal(a: &Element, b: &Element) -> bool {
    a.kind == b.kind
        && a.id == b.id
        && a.props.len() == b.props.len()
        && a.props
            .iter()
            .zip(b.props.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && shallow_equal(va, vb))
}

fn float_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}
