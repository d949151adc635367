//! Incremental groups.
//!
//! In incremental mode the growth dimensions of a test case ("zipped"
//! dimensions) are packed into a single list value, so one sweep entry is
//! a whole group. The group is then walked step by step, the zipped lists
//! advancing in lockstep, and each step only deploys what it adds to the
//! previous one.

use busbench_core::{ConfigError, ConfigResult, ParamValue, ParameterSet, ParameterSpace};

/// Pack the zipped dimensions of `space` that it declares. Absent zipped
/// dimensions keep their default on every step.
pub fn pack_space(space: &ParameterSpace, zipped: &[&str]) -> ConfigResult<ParameterSpace> {
    let present: Vec<&str> = zipped
        .iter()
        .copied()
        .filter(|dim| space.dimension(dim).is_some())
        .collect();
    space.packed(&present)
}

/// Lockstep walk over the packed `dims` of a group.
///
/// Step `i` holds the `i`-th value of every zipped list; the walk stops
/// with the shortest list. No dimensions yields no steps.
pub fn zip_parameters(group: &ParameterSet, dims: &[&str]) -> ConfigResult<Vec<ParameterSet>> {
    let mut lists = Vec::with_capacity(dims.len());
    for dim in dims {
        let value = group.require(dim)?;
        let list = value.as_list().ok_or_else(|| ConfigError::InvalidValue {
            dimension: dim.to_string(),
            reason: format!("expected a packed list, got {value}"),
        })?;
        lists.push((*dim, list));
    }
    let Some(len) = lists.iter().map(|(_, list)| list.len()).min() else {
        return Ok(Vec::new());
    };
    Ok((0..len)
        .map(|i| {
            lists
                .iter()
                .map(|(dim, list)| (dim.to_string(), list[i].clone()))
                .collect()
        })
        .collect())
}

/// The zipped dimensions a packed group actually carries.
pub fn packed_dims<'a>(group: &ParameterSet, zipped: &[&'a str]) -> Vec<&'a str> {
    zipped
        .iter()
        .copied()
        .filter(|dim| group.get(dim).and_then(ParamValue::as_list).is_some())
        .collect()
}

/// Every step of a group as a full combination: the group with its packed
/// lists replaced by the step's values.
pub fn expand_group(group: &ParameterSet, zipped: &[&str]) -> ConfigResult<Vec<ParameterSet>> {
    let dims = packed_dims(group, zipped);
    Ok(zip_parameters(group, &dims)?
        .into_iter()
        .map(|step| {
            let mut current = group.clone();
            current.merge(&step);
            current
        })
        .collect())
}

/// Values of `key` at step `index` and at the step before it (zero before
/// the first step).
pub fn step_values(steps: &[ParameterSet], index: usize, key: &str) -> ConfigResult<(u32, u32)> {
    let current = steps
        .get(index)
        .ok_or_else(|| ConfigError::MissingDimension(format!("{key} at step {index}")))?
        .require_u32(key)?;
    let previous = match index.checked_sub(1) {
        Some(prev) => steps
            .get(prev)
            .ok_or_else(|| ConfigError::MissingDimension(format!("{key} at step {prev}")))?
            .require_u32(key)?,
        None => 0,
    };
    Ok((previous, current))
}

/// Increase of `key` between step `index - 1` and step `index`.
pub fn step_delta(steps: &[ParameterSet], index: usize, key: &str) -> ConfigResult<u32> {
    let (previous, current) = step_values(steps, index, key)?;
    current.checked_sub(previous).ok_or_else(|| ConfigError::InvalidValue {
        dimension: key.to_string(),
        reason: format!("decreases from {previous} to {current} between steps"),
    })
}

/// Bijective base-26 label: `A`..`Z`, `AA`, `AB`, ...
pub fn group_label(mut n: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

/// Group labels starting after the groups a store already finished.
#[derive(Debug, Clone)]
pub struct GroupLabels {
    next: usize,
}

impl GroupLabels {
    pub fn starting_at(finished_groups: usize) -> Self {
        Self {
            next: finished_groups,
        }
    }
}

impl Iterator for GroupLabels {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let label = group_label(self.next);
        self.next += 1;
        Some(label)
    }
}

/// `<group label>-<step>`
pub fn iteration_id(label: &str, step: usize) -> String {
    format!("{label}-{step}")
}
