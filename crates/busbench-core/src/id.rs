//! Experiment identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;

/// Directory-safe identifier derived from a [`ParameterSet`].
///
/// Entries are joined as `key__value` in sorted key order, separated by
/// `-`. Path-hostile characters are escaped: `/` becomes `_sl_` and `:`
/// becomes `_sc_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(String);

impl ExperimentId {
    pub fn from_params(params: &ParameterSet) -> Self {
        let parts: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}__{}", escape(k), escape(&v.to_string())))
            .collect();
        Self(parts.join("-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn escape(s: &str) -> String {
    s.replace('/', "_sl_").replace(':', "_sc_")
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::params::ParameterSpace;

    #[test]
    fn id_is_sorted_and_escaped() {
        let params = ParameterSet::new()
            .with("version", "msimonin/ombt:singleton")
            .with("nbr_clients", 10);
        assert_eq!(
            params.experiment_id().as_str(),
            "nbr_clients__10-version__msimonin_sl_ombt_sc_singleton"
        );
    }

    #[test]
    fn id_ignores_construction_order() {
        let a = ParameterSet::new().with("b", 2).with("a", "x");
        let b = ParameterSet::new().with("a", "x").with("b", 2);
        assert_eq!(a.experiment_id(), b.experiment_id());
    }

    #[test]
    fn ids_are_unique_across_an_enumerated_space() {
        let space = ParameterSpace::new()
            .with("nbr_clients", [1, 10, 100])
            .with("nbr_servers", [1, 2, 5])
            .with("call_type", ["rpc-call", "rpc-cast"])
            .with("pause", [0.0, 0.5]);
        let sets = space.cross_product().unwrap();
        let ids: HashSet<ExperimentId> = sets.iter().map(ParameterSet::experiment_id).collect();
        assert_eq!(ids.len(), sets.len());
    }
}
