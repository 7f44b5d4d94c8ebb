//! Document, filter, and update primitives.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document: an ordered map of field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Comparison applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Field equals the value exactly.
    Eq(Value),
    /// Field is an integer strictly less than the value.
    Lt(Value),
    /// Field is an integer greater than or equal to the value.
    Gte(Value),
}

/// One field/comparison pair of a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Field the comparison applies to.
    pub field: String,
    /// The comparison itself.
    pub comparison: Comparison,
}

/// Conjunction of clauses selecting documents.
///
/// A missing field evaluates as `Value::Null`, so `eq("active", 1)` does not
/// match a document that never had an `active` field. The integer
/// comparisons (`lt`, `gte`) fail closed on non-integer values.
///
/// # Examples
///
/// ```
/// use stanchion_document::Filter;
///
/// let filter = Filter::new().eq("sid", "abc").eq("lock", 0);
/// assert_eq!(filter.clauses().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Create an empty filter (matches every document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            comparison: Comparison::Eq(value.into()),
        });
        self
    }

    /// Require `field < value` (integers only).
    pub fn lt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            comparison: Comparison::Lt(value.into()),
        });
        self
    }

    /// Require `field >= value` (integers only).
    pub fn gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            comparison: Comparison::Gte(value.into()),
        });
        self
    }

    /// The clauses of this filter.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|clause| {
            let actual = document.get(&clause.field).unwrap_or(&Value::Null);
            match &clause.comparison {
                Comparison::Eq(expected) => actual == expected,
                Comparison::Lt(bound) => match (actual.as_i64(), bound.as_i64()) {
                    (Some(actual), Some(bound)) => actual < bound,
                    _ => false,
                },
                Comparison::Gte(bound) => match (actual.as_i64(), bound.as_i64()) {
                    (Some(actual), Some(bound)) => actual >= bound,
                    _ => false,
                },
            }
        })
    }

    /// The equality clauses as field/value pairs.
    ///
    /// An upsert miss seeds the inserted document from these, so a filter on
    /// `{sid}` produces a document that already carries its key.
    pub fn equalities(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().filter_map(|clause| match &clause.comparison {
            Comparison::Eq(value) => Some((clause.field.as_str(), value)),
            _ => None,
        })
    }
}

/// An atomic field-set update: every listed field is written, every other
/// field of the target document is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Document,
}

impl FieldSet {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to write.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// The fields this update writes.
    pub fn fields(&self) -> &Document {
        &self.fields
    }

    /// Whether the update writes nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply the update to a document in place. Returns `true` if any field
    /// actually changed value.
    pub fn apply(&self, document: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.fields {
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }
}

impl From<Document> for FieldSet {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

/// Declaration of a collection index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, unique within the collection.
    pub name: String,
    /// Fields the index covers, in order.
    pub keys: Vec<String>,
    /// Whether the key tuple must be unique across documents.
    pub unique: bool,
}

impl IndexSpec {
    /// Declare a unique index.
    pub fn unique(
        name: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            unique: true,
        }
    }

    /// Declare a non-unique index.
    pub fn non_unique(
        name: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }
}

/// Outcome of an update call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    /// Documents the filter matched.
    pub matched: u64,
    /// Documents whose contents actually changed.
    pub modified: u64,
    /// Whether an upsert inserted a new document.
    pub upserted: bool,
}

/// Outcome of a delete call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Whether the store acknowledged the delete.
    pub acknowledged: bool,
    /// Documents removed.
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_eq_filter_matches() {
        let filter = Filter::new().eq("sid", "abc").eq("lock", 0);
        assert!(filter.matches(&doc(json!({"sid": "abc", "lock": 0}))));
        assert!(!filter.matches(&doc(json!({"sid": "abc", "lock": 1}))));
        assert!(!filter.matches(&doc(json!({"sid": "other", "lock": 0}))));
    }

    #[test]
    fn test_missing_field_is_null() {
        let filter = Filter::new().eq("active", 1);
        assert!(!filter.matches(&doc(json!({"sid": "abc"}))));

        // An explicit null is matchable.
        let filter = Filter::new().eq("active", Value::Null);
        assert!(filter.matches(&doc(json!({"sid": "abc"}))));
    }

    #[test]
    fn test_integer_comparisons() {
        let expired = Filter::new().lt("expiry", 100);
        assert!(expired.matches(&doc(json!({"expiry": 99}))));
        assert!(!expired.matches(&doc(json!({"expiry": 100}))));

        let live = Filter::new().gte("expiry", 100);
        assert!(live.matches(&doc(json!({"expiry": 100}))));
        assert!(!live.matches(&doc(json!({"expiry": 99}))));
    }

    #[test]
    fn test_comparisons_fail_closed_on_non_integers() {
        let filter = Filter::new().lt("expiry", 100);
        assert!(!filter.matches(&doc(json!({"expiry": "soon"}))));
        assert!(!filter.matches(&doc(json!({"sid": "abc"}))));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({"anything": 1}))));
        assert!(Filter::new().matches(&Document::new()));
    }

    #[test]
    fn test_equalities_skip_range_clauses() {
        let filter = Filter::new().eq("sid", "abc").gte("expiry", 5);
        let pairs: Vec<_> = filter.equalities().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "sid");
    }

    #[test]
    fn test_field_set_apply_reports_change() {
        let mut document = doc(json!({"lock": 0, "sid": "abc"}));
        let set = FieldSet::new().set("lock", 1);
        assert!(set.apply(&mut document));
        assert_eq!(document["lock"], json!(1));
        // Same write again changes nothing.
        assert!(!set.apply(&mut document));
    }

    #[test]
    fn test_field_set_preserves_other_fields() {
        let mut document = doc(json!({"sid": "abc", "note": "kept"}));
        FieldSet::new().set("lock", 1).apply(&mut document);
        assert_eq!(document["note"], json!("kept"));
        assert_eq!(document["lock"], json!(1));
    }
}
