//! Parameter spaces and the parameter sets enumerated from them.
//!
//! Both types are backed by `BTreeMap`, so dimension names are always
//! iterated and serialized in sorted order. Two sets built in different
//! insertion orders serialize to the same canonical JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, ConfigResult};
use crate::id::ExperimentId;
use crate::value::ParamValue;

// ── ParameterSet ──────────────────────────────────────────────────

/// One point of the cross product: dimension name → value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.to_string(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite every entry of `other` into `self`.
    pub fn merge(&mut self, other: &ParameterSet) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Canonical serialization (sorted keys), used as the sweep-state key.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn experiment_id(&self) -> ExperimentId {
        ExperimentId::from_params(self)
    }

    pub fn require(&self, name: &str) -> ConfigResult<&ParamValue> {
        self.get(name)
            .ok_or_else(|| ConfigError::MissingDimension(name.to_string()))
    }

    pub fn require_u32(&self, name: &str) -> ConfigResult<u32> {
        self.require(name)?
            .as_u32()
            .ok_or_else(|| ConfigError::InvalidValue {
                dimension: name.to_string(),
                reason: "expected a non-negative integer".to_string(),
            })
    }

    pub fn require_f64(&self, name: &str) -> ConfigResult<f64> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| ConfigError::InvalidValue {
                dimension: name.to_string(),
                reason: "expected a number".to_string(),
            })
    }

    pub fn require_str(&self, name: &str) -> ConfigResult<&str> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| ConfigError::InvalidValue {
                dimension: name.to_string(),
                reason: "expected a string".to_string(),
            })
    }

    /// Optional dimension; absent is `Ok(None)`, present-but-wrong is an error.
    pub fn optional_u32(&self, name: &str) -> ConfigResult<Option<u32>> {
        match self.get(name) {
            None => Ok(None),
            Some(_) => self.require_u32(name).map(Some),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ── ParameterSpace ────────────────────────────────────────────────

/// Dimension name → ordered candidate values.
///
/// On deserialization a scalar is accepted as a one-element list, so
/// `timeout = 60` and `timeout = [60]` are equivalent in `busbench.toml`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSpace(BTreeMap<String, Vec<ParamValue>>);

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<ParamValue>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert<V: Into<ParamValue>>(&mut self, name: &str, values: impl IntoIterator<Item = V>) {
        self.0
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
    }

    pub fn dimension(&self, name: &str) -> Option<&[ParamValue]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn require_dimension(&self, name: &str) -> ConfigResult<&[ParamValue]> {
        self.dimension(name)
            .ok_or_else(|| ConfigError::MissingDimension(name.to_string()))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Reject spaces that would enumerate nothing.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.0.is_empty() {
            return Err(ConfigError::MalformedSpace(
                "parameter space has no dimensions".to_string(),
            ));
        }
        if let Some((name, _)) = self.0.iter().find(|(_, values)| values.is_empty()) {
            return Err(ConfigError::MalformedSpace(format!(
                "dimension {name} has no candidate values"
            )));
        }
        Ok(())
    }

    /// Full cross product, first dimension (by name) outermost.
    pub fn cross_product(&self) -> ConfigResult<Vec<ParameterSet>> {
        self.validate()?;
        let dims: Vec<(&String, &Vec<ParamValue>)> = self.0.iter().collect();
        let mut outputs = Vec::new();
        expand(&dims, 0, ParameterSet::new(), &mut outputs);
        Ok(outputs)
    }

    /// Copy of this space where each listed dimension is packed into a
    /// single list value, so the cross product does not sweep over it.
    pub fn packed(&self, dims: &[&str]) -> ConfigResult<ParameterSpace> {
        let mut packed = self.clone();
        for dim in dims {
            let values = self.require_dimension(dim)?.to_vec();
            packed
                .0
                .insert((*dim).to_string(), vec![ParamValue::List(values)]);
        }
        Ok(packed)
    }
}

fn expand(
    dims: &[(&String, &Vec<ParamValue>)],
    idx: usize,
    current: ParameterSet,
    outputs: &mut Vec<ParameterSet>,
) {
    if idx == dims.len() {
        outputs.push(current);
        return;
    }
    let (name, values) = dims[idx];
    for value in values {
        let mut next = current.clone();
        next.0.insert(name.clone(), value.clone());
        expand(dims, idx + 1, next, outputs);
    }
}

impl Serialize for ParameterSpace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParameterSpace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, ParamValue>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(name, value)| match value {
                    ParamValue::List(values) => (name, values),
                    scalar => (name, vec![scalar]),
                })
                .collect(),
        ))
    }
}
