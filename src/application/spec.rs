// Input schema: the JSON problem description handed to the tool
// Enumerated fields stay strings here; they are resolved while building so
// that bad values surface as typed build errors.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::BuildError;

/// JSON object kept in declared order.
///
/// Variable declarations and term lists are walked in the order the caller
/// wrote them so that model construction is reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or overwrite; an overwritten key keeps its first position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Complete problem description
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProblemSpec {
    pub problem: ProblemHeader,
    pub objective: ObjectiveSpec,
    pub variables: OrderedMap<VarSpec>,
    pub constraints: ConstraintsSpec,
}

impl ProblemSpec {
    pub fn from_json(value: serde_json::Value) -> Result<Self, BuildError> {
        serde_json::from_value(value).map_err(|e| BuildError::MalformedSpec(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, BuildError> {
        serde_json::from_str(text).map_err(|e| BuildError::MalformedSpec(e.to_string()))
    }

    /// Model name, `OptimizationProblem` when none is given
    pub fn name(&self) -> &str {
        self.problem
            .name
            .as_deref()
            .unwrap_or("OptimizationProblem")
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProblemHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub problem_type: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ObjectiveSpec {
    /// `minimize` or `maximize`
    #[serde(rename = "type")]
    pub direction: String,
    /// `linear` or `quadratic`
    pub function_type: String,
    pub linear_terms: OrderedMap<f64>,
    #[serde(default)]
    pub quadratic_terms: Vec<QuadTermSpec>,
}

/// Variable declaration; the map key is the identifier terms refer to
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VarSpec {
    #[serde(rename = "type", default)]
    pub var_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lb: Option<f64>,
    #[serde(default)]
    pub ub: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct QuadTermSpec {
    pub var1: String,
    pub var2: String,
    pub coef: f64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ConstraintsSpec {
    #[serde(default)]
    pub linear_constraints: Vec<LinearConstraintSpec>,
    #[serde(default)]
    pub quadratic_constraints: Vec<QuadraticConstraintSpec>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LinearConstraintSpec {
    pub lhs: OrderedMap<f64>,
    pub rhs: f64,
    pub sign: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `quadratic_terms + linear_terms + constant (sign) 0`
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct QuadraticConstraintSpec {
    #[serde(default)]
    pub quadratic_terms: Vec<QuadTermSpec>,
    #[serde(default)]
    pub linear_terms: OrderedMap<f64>,
    #[serde(default)]
    pub constant: f64,
    pub sign: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variables_keep_declared_order() {
        let spec = ProblemSpec::from_json(json!({
            "problem": {"type": "LP"},
            "objective": {"type": "minimize", "function_type": "linear", "linear_terms": {"z": 1, "a": 2}},
            "variables": {"z": {}, "a": {"lb": -1}, "m": {"type": "integer", "name": "count"}},
            "constraints": {}
        }))
        .unwrap();

        assert_eq!(spec.variables.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(spec.objective.linear_terms.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(spec.variables.get("a").and_then(|v| v.lb), Some(-1.0));
        assert_eq!(spec.name(), "OptimizationProblem");
        assert!(spec.constraints.quadratic_constraints.is_empty());
    }

    #[test]
    fn missing_required_keys_are_malformed() {
        let err = ProblemSpec::from_json(json!({
            "problem": {"type": "LP"},
            "variables": {},
            "constraints": {}
        }))
        .unwrap_err();
        assert!(matches!(err, BuildError::MalformedSpec(msg) if msg.contains("objective")));
    }

    #[test]
    fn non_numeric_coefficient_is_malformed() {
        let err = ProblemSpec::from_json_str(
            r#"{"problem": {"type": "LP"},
                "objective": {"type": "minimize", "function_type": "linear", "linear_terms": {"x": "two"}},
                "variables": {"x": {}}, "constraints": {}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::MalformedSpec(_)));
    }

    #[test]
    fn duplicate_keys_keep_first_position_and_last_value() {
        let map: OrderedMap<f64> = serde_json::from_str(r#"{"x": 1, "y": 2, "x": 3}"#).unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("x", &3.0), ("y", &2.0)]);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"x":3.0,"y":2.0}"#);
    }
}
