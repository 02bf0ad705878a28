//! Node parameters: typed values in a dot-separated hierarchical namespace.
//!
//! The store keeps every parameter a node has ever been handed; entries are
//! overwritten by later sets and never deleted. All operations take the
//! store's single exclusive lock for the duration of the call.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    NotSet,
    Bool,
    Integer,
    Double,
    String,
    ByteArray,
}

impl ParameterType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::NotSet => 0,
            Self::Bool => 1,
            Self::Integer => 2,
            Self::Double => 3,
            Self::String => 4,
            Self::ByteArray => 5,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Bool,
            2 => Self::Integer,
            3 => Self::Double,
            4 => Self::String,
            5 => Self::ByteArray,
            _ => Self::NotSet,
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    #[default]
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
}

impl ParameterValue {
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::NotSet => ParameterType::NotSet,
            Self::Bool(_) => ParameterType::Bool,
            Self::Integer(_) => ParameterType::Integer,
            Self::Double(_) => ParameterType::Double,
            Self::String(_) => ParameterType::String,
            Self::ByteArray(_) => ParameterType::ByteArray,
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for ParameterValue {
    fn from(v: Vec<u8>) -> Self {
        Self::ByteArray(v)
    }
}

/// Wire record: a named parameter value as exchanged with callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Wire record: name and type of a stored parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub parameter_type: ParameterType,
}

/// Wire record: per-item outcome of a `set_parameters` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetParametersResult {
    pub successful: bool,
}

/// Wire record: one result of a `list_parameters` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParametersResult {
    pub parameter_names: Vec<String>,
    pub parameter_prefixes: Vec<String>,
}

/// A stored parameter: name plus typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVariant {
    name: String,
    value: ParameterValue,
}

impl ParameterVariant {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn from_parameter(parameter: Parameter) -> Self {
        Self {
            name: parameter.name,
            value: parameter.value,
        }
    }

    pub fn to_parameter(&self) -> Parameter {
        Parameter {
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    pub fn get_type(&self) -> ParameterType {
        self.value.parameter_type()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            ParameterValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            ParameterValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.value {
            ParameterValue::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Parameter store holding every parameter set on a node.
///
/// Entries iterate in name order. Query results follow that order, not the
/// order of the requested names.
#[derive(Default)]
pub struct ParameterStore {
    inner: Mutex<BTreeMap<String, ParameterVariant>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign each parameter in turn, overwriting existing entries. Within a
    /// batch the last write to a name wins.
    ///
    /// Every item reports success.
    // TODO: validate against declared constraints once descriptors carry them
    pub fn set_parameters(
        &self,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Vec<SetParametersResult> {
        let mut map = self.inner.lock();
        parameters
            .into_iter()
            .map(|p| {
                map.insert(p.name.clone(), ParameterVariant::from_parameter(p));
                SetParametersResult { successful: true }
            })
            .collect()
    }

    /// Replace the store with the batch merged over the current contents:
    /// batch values win on name collisions, untouched entries survive. The
    /// replacement is a single swap under the lock, so readers never observe
    /// a partially merged store.
    ///
    /// Unlike [`set_parameters`](Self::set_parameters) this reports one
    /// overall result rather than one per item.
    pub fn set_parameters_atomically(
        &self,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> SetParametersResult {
        let mut staged: BTreeMap<String, ParameterVariant> = BTreeMap::new();
        for p in parameters {
            staged.insert(p.name.clone(), ParameterVariant::from_parameter(p));
        }
        let mut map = self.inner.lock();
        for (name, value) in std::mem::take(&mut *map) {
            staged.entry(name).or_insert(value);
        }
        *map = staged;
        SetParametersResult { successful: true }
    }

    /// Values of every stored parameter whose name appears in `names`, in
    /// store order.
    pub fn get_parameters(&self, names: &[String]) -> Vec<ParameterVariant> {
        let map = self.inner.lock();
        map.values()
            .filter(|v| names.iter().any(|n| n == v.name()))
            .cloned()
            .collect()
    }

    /// Name/type descriptors for every stored parameter whose name appears
    /// in `names`, in store order.
    pub fn describe_parameters(&self, names: &[String]) -> Vec<ParameterDescriptor> {
        let map = self.inner.lock();
        map.values()
            .filter(|v| names.iter().any(|n| n == v.name()))
            .map(|v| ParameterDescriptor {
                name: v.name().to_string(),
                parameter_type: v.get_type(),
            })
            .collect()
    }

    /// Walk the whole store: for each entry emit its type if requested in
    /// `names`, a `NotSet` placeholder otherwise. The result length always
    /// equals the store size.
    pub fn get_parameter_types(&self, names: &[String]) -> Vec<ParameterType> {
        let map = self.inner.lock();
        map.values()
            .map(|v| {
                if names.iter().any(|n| n == v.name()) {
                    v.get_type()
                } else {
                    ParameterType::NotSet
                }
            })
            .collect()
    }

    /// One result per stored parameter that sits under any of `prefixes`
    /// within `depth` namespace levels.
    ///
    /// An entry matches prefix `p` when its name starts with `p + "."` and
    /// the remainder contains fewer than `depth` separators. Results are not
    /// merged: each carries a single name and that name's own prefix.
    pub fn list_parameters(&self, prefixes: &[String], depth: u64) -> Vec<ListParametersResult> {
        let map = self.inner.lock();
        let mut results = Vec::new();
        for name in map.keys() {
            let matched = prefixes.iter().any(|prefix| {
                match name
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                {
                    Some(rest) => (rest.matches('.').count() as u64) < depth,
                    None => false,
                }
            });
            if !matched {
                continue;
            }
            let mut result = ListParametersResult::default();
            result.parameter_names.push(name.clone());
            if let Some(last_separator) = name.rfind('.') {
                let prefix = name[..last_separator].to_string();
                if !result.parameter_prefixes.contains(&prefix) {
                    result.parameter_prefixes.push(prefix);
                }
            }
            results.push(result);
        }
        results
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
