//! Filter and ordering applied to pending combinations.

use std::cmp::Ordering;
use std::fmt;

use busbench_core::{ParamValue, ParameterSet};

/// Decides which pending combinations are eligible and in which order.
pub trait SweepPolicy {
    /// Eligible combinations, first to run first.
    fn select(&self, pending: Vec<ParameterSet>) -> Vec<ParameterSet>;
}

/// Predicate over a combination.
pub type Filter = fn(&ParameterSet) -> bool;

/// Keep combinations with no more servers than clients.
pub fn servers_at_most_clients(params: &ParameterSet) -> bool {
    match (params.get("nbr_servers"), params.get("nbr_clients")) {
        (Some(servers), Some(clients)) => servers.total_cmp(clients) != Ordering::Greater,
        _ => true,
    }
}

/// Optional filter, then a stable sort by `(driver, call_type, key)`.
#[derive(Clone)]
pub struct FilterOrder {
    pub filter: Option<Filter>,
    pub key: String,
}

impl FilterOrder {
    pub fn new(key: &str) -> Self {
        Self {
            filter: None,
            key: key.to_string(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn compare(&self, a: &ParameterSet, b: &ParameterSet) -> Ordering {
        for dim in ["driver", "call_type", self.key.as_str()] {
            let ord = compare_dim(a.get(dim), b.get(dim));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn compare_dim(a: Option<&ParamValue>, b: Option<&ParamValue>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Debug for FilterOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOrder")
            .field("filtered", &self.filter.is_some())
            .field("key", &self.key)
            .finish()
    }
}

impl SweepPolicy for FilterOrder {
    fn select(&self, pending: Vec<ParameterSet>) -> Vec<ParameterSet> {
        let mut eligible: Vec<ParameterSet> = match self.filter {
            Some(filter) => pending.into_iter().filter(|p| filter(p)).collect(),
            None => pending,
        };
        eligible.sort_by(|a, b| self.compare(a, b));
        eligible
    }
}
