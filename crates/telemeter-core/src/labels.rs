//! Label sets and series identifiers.
//!
//! A `LabelSet` is an immutable value: once built it is only cloned and
//! compared. Keys are held in a `BTreeMap`, so iteration is always in
//! lexicographic key order regardless of how the set was assembled. Equality,
//! ordering and hashing all follow that canonical order.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Result, TelemeterError};

/// Immutable, order-independent set of `name -> value` labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    /// Empty label set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs.
    ///
    /// A repeated name keeps the value that appears last. Empty names are
    /// rejected; empty values are allowed.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut labels = BTreeMap::new();
        for (k, v) in pairs {
            let k = k.into();
            if k.is_empty() {
                return Err(TelemeterError::InvalidLabel("label name must not be empty".into()));
            }
            labels.insert(k, v.into());
        }
        Ok(Self { labels })
    }

    /// Return a copy with one more label (replacing an existing value).
    pub fn with(&self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TelemeterError::InvalidLabel("label name must not be empty".into()));
        }
        let mut labels = self.labels.clone();
        labels.insert(name, value.into());
        Ok(Self { labels })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Labels in canonical (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Canonical, unescaped form: `a="1",b="2",`.
impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            write!(f, "{k}=\"{v}\",")?;
        }
        Ok(())
    }
}

/// Registry key: metric name plus label set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId {
    name: String,
    labels: LabelSet,
}

impl MetricId {
    pub fn new(name: impl Into<String>, labels: LabelSet) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TelemeterError::InvalidMetricName(name));
        }
        Ok(Self { name, labels })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.labels)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(t: &T) -> u64 {
        let mut h = DefaultHasher::new();
        t.hash(&mut h);
        h.finish()
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = LabelSet::from_pairs([("path", "/sum"), ("method", "GET")]).unwrap();
        let b = LabelSet::from_pairs([("method", "GET"), ("path", "/sum")]).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "method=\"GET\",path=\"/sum\",");
    }

    #[test]
    fn empty_name_rejected_empty_value_kept() {
        let err = LabelSet::from_pairs([("", "x")]).unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_LABEL");

        let ls = LabelSet::from_pairs([("k", "")]).unwrap();
        assert_eq!(ls.get("k"), Some(""));
        assert!(LabelSet::new().with("", "v").is_err());
    }

    #[test]
    fn duplicate_name_keeps_last() {
        let ls = LabelSet::from_pairs([("k", "1"), ("k", "2")]).unwrap();
        assert_eq!(ls.len(), 1);
        assert_eq!(ls.get("k"), Some("2"));
    }

    #[test]
    fn metric_id_equality_and_name_check() {
        let l1 = LabelSet::from_pairs([("a", "1"), ("b", "2")]).unwrap();
        let l2 = LabelSet::from_pairs([("b", "2"), ("a", "1")]).unwrap();
        assert_eq!(MetricId::new("m", l1.clone()).unwrap(), MetricId::new("m", l2).unwrap());
        assert_ne!(MetricId::new("m", l1.clone()).unwrap(), MetricId::new("n", l1).unwrap());
        assert!(MetricId::new("", LabelSet::new()).is_err());
    }

    #[test]
    fn serializes_as_sorted_map() {
        let ls = LabelSet::from_pairs([("z", "1"), ("a", "2")]).unwrap();
        assert_eq!(serde_json::to_string(&ls).unwrap(), r#"{"a":"2","z":"1"}"#);
    }
}
