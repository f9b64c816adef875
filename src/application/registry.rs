// Variable registry: one model variable per declared variable key

use std::collections::HashMap;

use tracing::debug;

use super::spec::{OrderedMap, VarSpec};
use crate::domain::{BuildError, Model, VarId, VariableDef, VariableType};

/// Maps the identifiers used in term lists to model variable handles
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    order: Vec<(String, VarId)>,
    index: HashMap<String, VarId>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: &str, id: VarId) {
        self.order.push((key.to_string(), id));
        self.index.insert(key.to_string(), id);
    }

    /// Look up a variable key.
    ///
    /// A missing key is an error naming where it was referenced; it never
    /// counts as a zero contribution.
    pub fn resolve(&self, key: &str, context: &str) -> Result<VarId, BuildError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| BuildError::UnknownVariable {
                name: key.to_string(),
                context: context.to_string(),
            })
    }

    /// Registered keys with their handles, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, VarId)> {
        self.order.iter().map(|(k, id)| (k.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolve one declaration into a model variable definition.
///
/// Omitted bounds keep the defaults of the variable type (`[0, +inf)`, or
/// `[0, 1]` for binaries); the display name defaults to the key.
pub fn variable_def(key: &str, spec: &VarSpec) -> VariableDef {
    let variable_type = VariableType::from_spec(spec.var_type.as_deref());
    let mut def = VariableDef::of_type(spec.name.as_deref().unwrap_or(key), variable_type);
    if let Some(lb) = spec.lb {
        def.lower_bound = lb;
    }
    if let Some(ub) = spec.ub {
        def.upper_bound = ub;
    }
    def
}

/// Add every declared variable to the model and commit them as one batch
pub fn add_variables(
    model: Option<&mut Model>,
    variables: &OrderedMap<VarSpec>,
) -> Result<VariableRegistry, BuildError> {
    let model = model.ok_or(BuildError::ModelBuild("variables"))?;

    let mut registry = VariableRegistry::new();
    for (key, spec) in variables.iter() {
        let id = model.add_variable(variable_def(key, spec));
        registry.insert(key, id);
    }
    model.update();

    debug!(count = registry.len(), "variables added");
    Ok(registry)
}
