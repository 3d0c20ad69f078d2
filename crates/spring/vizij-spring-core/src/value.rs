//! Public value shapes and their flat-buffer adapter.
//!
//! A spring animates one of three shapes: a scalar, a fixed-length vector or a
//! flat record of named numbers. The shape is captured once from the initial
//! value; from then on every conversion goes through the same [`ValueShape`]
//! without re-inspecting the input.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A value a spring can animate.
///
/// Serialized untagged, so `1.5`, `[1, 2]` and `{"x": 1}` are all valid
/// documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpringValue {
    Scalar(f64),
    Vector(Vec<f64>),
    /// Field order is preserved; the first value seen fixes it for the spring.
    Record(IndexMap<String, f64>),
}

impl SpringValue {
    /// Convenience constructor for records.
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, f64)>) -> Self {
        SpringValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            SpringValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            SpringValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, f64>> {
        match self {
            SpringValue::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<f64> for SpringValue {
    fn from(v: f64) -> Self {
        SpringValue::Scalar(v)
    }
}

impl From<Vec<f64>> for SpringValue {
    fn from(v: Vec<f64>) -> Self {
        SpringValue::Vector(v)
    }
}

impl<const N: usize> From<[f64; N]> for SpringValue {
    fn from(v: [f64; N]) -> Self {
        SpringValue::Vector(v.to_vec())
    }
}

impl From<IndexMap<String, f64>> for SpringValue {
    fn from(v: IndexMap<String, f64>) -> Self {
        SpringValue::Record(v)
    }
}

/// Structural shape of a spring's value, fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum ValueShape {
    Scalar,
    Vector(usize),
    /// Field names in buffer order.
    Record(Vec<String>),
}

impl ValueShape {
    /// Capture the shape of `value`.
    pub fn of(value: &SpringValue) -> Self {
        match value {
            SpringValue::Scalar(_) => ValueShape::Scalar,
            SpringValue::Vector(v) => ValueShape::Vector(v.len()),
            SpringValue::Record(r) => ValueShape::Record(r.keys().cloned().collect()),
        }
    }

    /// Buffer length for this shape.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ValueShape::Scalar => 1,
            ValueShape::Vector(n) => *n,
            ValueShape::Record(keys) => keys.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten `value` into a fresh buffer.
    pub fn to_buffer(&self, value: &SpringValue) -> Vec<f64> {
        let mut out = vec![0.0; self.len()];
        self.write_buffer(value, &mut out);
        out
    }

    /// Flatten `value` into `out`.
    ///
    /// `value` is expected to have this shape. Components it does not provide
    /// (a shorter vector, a record missing a field) leave `out` untouched;
    /// surplus components and unknown fields are ignored.
    pub fn write_buffer(&self, value: &SpringValue, out: &mut [f64]) {
        match (self, value) {
            (_, SpringValue::Scalar(v)) => {
                if let Some(slot) = out.first_mut() {
                    *slot = *v;
                }
            }
            (_, SpringValue::Vector(v)) => {
                for (slot, x) in out.iter_mut().zip(v) {
                    *slot = *x;
                }
            }
            (ValueShape::Record(keys), SpringValue::Record(r)) => {
                for (slot, key) in out.iter_mut().zip(keys) {
                    if let Some(x) = r.get(key) {
                        *slot = *x;
                    }
                }
            }
            (_, SpringValue::Record(r)) => {
                for (slot, x) in out.iter_mut().zip(r.values()) {
                    *slot = *x;
                }
            }
        }
    }

    /// Rebuild a public value from a buffer. Always returns an owned value,
    /// never a view into `buf`.
    pub fn from_buffer(&self, buf: &[f64]) -> SpringValue {
        match self {
            ValueShape::Scalar => SpringValue::Scalar(buf.first().copied().unwrap_or_default()),
            ValueShape::Vector(_) => SpringValue::Vector(buf.to_vec()),
            ValueShape::Record(keys) => SpringValue::Record(
                keys.iter()
                    .cloned()
                    .zip(buf.iter().copied())
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: SpringValue) {
        let shape = ValueShape::of(&value);
        let buf = shape.to_buffer(&value);
        assert_eq!(buf.len(), shape.len());
        assert_eq!(shape.from_buffer(&buf), value);
    }

    #[test]
    fn round_trips_every_shape() {
        round_trip(SpringValue::Scalar(-2.5));
        round_trip(SpringValue::Vector(vec![0.1, 0.2, 0.3, 1e9]));
        round_trip(SpringValue::record([("x", 1.0), ("y", -4.0), ("z", 0.25)]));
    }

    #[test]
    fn shapes_are_captured_once() {
        assert_eq!(ValueShape::of(&1.0.into()), ValueShape::Scalar);
        assert_eq!(ValueShape::of(&[1.0, 2.0].into()), ValueShape::Vector(2));
        assert_eq!(
            ValueShape::of(&SpringValue::record([("b", 1.0), ("a", 2.0)])),
            ValueShape::Record(vec!["b".into(), "a".into()])
        );
    }

    #[test]
    fn record_buffer_follows_captured_key_order() {
        let shape = ValueShape::of(&SpringValue::record([("x", 0.0), ("y", 0.0)]));
        let reordered = SpringValue::record([("y", 2.0), ("x", 1.0)]);
        assert_eq!(shape.to_buffer(&reordered), vec![1.0, 2.0]);

        let out = shape.from_buffer(&[1.0, 2.0]);
        let keys: Vec<&str> = out
            .as_record()
            .expect("record")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["x", "y"]);
    }

    #[test]
    fn missing_record_fields_keep_previous_component() {
        let shape = ValueShape::Record(vec!["x".into(), "y".into()]);
        let mut buf = vec![5.0, 6.0];
        shape.write_buffer(&SpringValue::record([("y", 1.0), ("w", 9.0)]), &mut buf);
        assert_eq!(buf, vec![5.0, 1.0]);
    }

    #[test]
    fn published_values_do_not_alias_buffers() {
        let shape = ValueShape::Vector(2);
        let mut buf = vec![1.0, 2.0];
        let published = shape.from_buffer(&buf);
        buf[0] = 100.0;
        assert_eq!(published, SpringValue::Vector(vec![1.0, 2.0]));
    }

    #[test]
    fn untagged_json_documents() {
        let s: SpringValue = serde_json::from_str("1.5").expect("scalar");
        assert_eq!(s, SpringValue::Scalar(1.5));
        let v: SpringValue = serde_json::from_str("[1, 2]").expect("vector");
        assert_eq!(v, SpringValue::Vector(vec![1.0, 2.0]));
        let r: SpringValue = serde_json::from_str(r#"{"y": 1, "x": 2}"#).expect("record");
        assert_eq!(
            ValueShape::of(&r),
            ValueShape::Record(vec!["y".into(), "x".into()])
        );
        assert_eq!(serde_json::to_string(&r).expect("json"), r#"{"y":1.0,"x":2.0}"#);
    }
}
