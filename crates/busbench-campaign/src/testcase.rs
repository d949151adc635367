//! Registered test cases.
//!
//! | test | shape | order key | zipped |
//! |---|---|---|---|
//! | `test_case_1` | per agent | `nbr_clients` | servers, clients, calls, pause |
//! | `test_case_2` | per topic | `nbr_topics` | topics, calls, pause |
//! | `test_case_3` | fanout | `nbr_servers` | servers, calls, pause |
//! | `test_case_4` | broadcast | `nbr_topics` | none |

use std::fmt;
use std::str::FromStr;

use busbench_core::{ConfigError, ConfigResult, ParameterSet, TopicSet};
use busbench_placement::{Load, LoadShape, PlacementResult, ShardRequest};
use serde::{Deserialize, Serialize};

use crate::incremental::{step_delta, step_values};
use crate::policy::{FilterOrder, servers_at_most_clients};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestCase {
    /// One single large distributed target.
    #[serde(rename = "test_case_1")]
    PerAgent,
    /// Multiple distributed targets, one per topic.
    #[serde(rename = "test_case_2")]
    PerTopic,
    /// One large distributed fanout.
    #[serde(rename = "test_case_3")]
    Fanout,
    /// Broadcast domains, one per topic.
    #[serde(rename = "test_case_4")]
    Broadcast,
}

/// What one step (or one plain run) deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLoad {
    pub load: Load,
    pub topics: Vec<String>,
}

impl TestCase {
    pub const ALL: [TestCase; 4] = [
        TestCase::PerAgent,
        TestCase::PerTopic,
        TestCase::Fanout,
        TestCase::Broadcast,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TestCase::PerAgent => "test_case_1",
            TestCase::PerTopic => "test_case_2",
            TestCase::Fanout => "test_case_3",
            TestCase::Broadcast => "test_case_4",
        }
    }

    pub fn shape(&self) -> LoadShape {
        match self {
            TestCase::PerAgent => LoadShape::PerAgent,
            TestCase::PerTopic => LoadShape::PerTopic,
            TestCase::Fanout => LoadShape::Fanout,
            TestCase::Broadcast => LoadShape::Broadcast,
        }
    }

    pub fn order_key(&self) -> &'static str {
        match self {
            TestCase::PerAgent => "nbr_clients",
            TestCase::PerTopic | TestCase::Broadcast => "nbr_topics",
            TestCase::Fanout => "nbr_servers",
        }
    }

    /// Growth dimensions walked in lockstep by incremental campaigns.
    pub fn zipped(&self) -> &'static [&'static str] {
        match self {
            TestCase::PerAgent => &["nbr_servers", "nbr_clients", "nbr_calls", "pause"],
            TestCase::PerTopic => &["nbr_topics", "nbr_calls", "pause"],
            TestCase::Fanout => &["nbr_servers", "nbr_calls", "pause"],
            TestCase::Broadcast => &[],
        }
    }

    pub fn supports_incremental(&self) -> bool {
        !self.zipped().is_empty()
    }

    /// Call type imposed by the test case regardless of the combination.
    pub fn forced_call_type(&self) -> Option<&'static str> {
        match self {
            TestCase::Fanout => Some("rpc-fanout"),
            TestCase::Broadcast => Some("rpc-cast"),
            _ => None,
        }
    }

    /// Filter and order for the sweep. `unfiltered` drops the filter but
    /// keeps the order.
    pub fn policy(&self, unfiltered: bool) -> FilterOrder {
        let policy = FilterOrder::new(self.order_key());
        match self {
            TestCase::PerAgent if !unfiltered => policy.with_filter(servers_at_most_clients),
            _ => policy,
        }
    }

    /// Apply the forced call type to a combination filled with defaults.
    pub fn normalize(&self, params: &ParameterSet) -> ParameterSet {
        let mut params = params.clone();
        if let Some(call_type) = self.forced_call_type() {
            params.insert("call_type", call_type);
        }
        params
    }

    /// Load and topics of a plain (non-incremental) run.
    pub fn full_load(&self, params: &ParameterSet) -> ConfigResult<StepLoad> {
        let topics = match self {
            TestCase::PerAgent | TestCase::Fanout => TopicSet::new(1),
            TestCase::PerTopic | TestCase::Broadcast => {
                TopicSet::new(params.require_u32("nbr_topics")? as usize)
            }
        };
        Ok(StepLoad {
            load: Load {
                nbr_clients: params.require_u32("nbr_clients")?,
                nbr_servers: params.require_u32("nbr_servers")?,
            },
            topics: topics.into_vec(),
        })
    }

    /// What step `index` of a group adds to the previous steps. `steps`
    /// are the group's expanded combinations, filled with defaults.
    pub fn step_load(&self, steps: &[ParameterSet], index: usize) -> ConfigResult<StepLoad> {
        let single_topic = || TopicSet::new(1).into_vec();
        match self {
            TestCase::PerAgent => Ok(StepLoad {
                load: Load {
                    nbr_clients: step_delta(steps, index, "nbr_clients")?,
                    nbr_servers: step_delta(steps, index, "nbr_servers")?,
                },
                topics: single_topic(),
            }),
            TestCase::PerTopic => {
                let mut largest = 0;
                for step in steps {
                    largest = largest.max(step.require_u32("nbr_topics")?);
                }
                let all = TopicSet::new(largest as usize);
                let (previous, current) = step_values(steps, index, "nbr_topics")?;
                let topics = all.slice(previous as usize, current as usize);
                let n = topics.len() as u32;
                Ok(StepLoad {
                    load: Load {
                        nbr_clients: n,
                        nbr_servers: n,
                    },
                    topics,
                })
            }
            TestCase::Fanout => {
                let (previous, _) = step_values(steps, index, "nbr_servers")?;
                Ok(StepLoad {
                    load: Load {
                        nbr_clients: u32::from(previous == 0),
                        nbr_servers: step_delta(steps, index, "nbr_servers")?,
                    },
                    topics: single_topic(),
                })
            }
            TestCase::Broadcast => Err(ConfigError::Unsupported(format!(
                "{} has no incremental mode",
                self.name()
            ))),
        }
    }

    /// Per-shard requests for `step` over `shards` control-bus replicas.
    pub fn shard_requests(&self, step: &StepLoad, shards: usize) -> PlacementResult<Vec<ShardRequest>> {
        self.shape().shard_requests(step.load, &step.topics, shards)
    }
}

impl FromStr for TestCase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestCase::ALL
            .into_iter()
            .find(|tc| tc.name() == s)
            .ok_or_else(|| ConfigError::UnknownTestCase(s.to_string()))
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use busbench_core::Defaults;

    use super::*;
    use crate::incremental::expand_group;
    use crate::policy::SweepPolicy;

    fn group(pairs: &[(&str, &[i64])]) -> ParameterSet {
        pairs
            .iter()
            .map(|(k, vs)| {
                (
                    k.to_string(),
                    busbench_core::ParamValue::List(vs.iter().copied().map(Into::into).collect()),
                )
            })
            .collect()
    }

    fn steps(tc: TestCase, pairs: &[(&str, &[i64])]) -> Vec<ParameterSet> {
        expand_group(&group(pairs), tc.zipped())
            .unwrap()
            .iter()
            .map(|s| Defaults::default().fill(s))
            .collect()
    }

    #[test]
    fn names_parse_back() {
        for tc in TestCase::ALL {
            assert_eq!(tc.name().parse::<TestCase>().unwrap(), tc);
        }
        assert!(matches!(
            "test_case_9".parse::<TestCase>(),
            Err(ConfigError::UnknownTestCase(_))
        ));
    }

    #[test]
    fn per_agent_steps_deploy_deltas_on_one_topic() {
        let steps = steps(
            TestCase::PerAgent,
            &[("nbr_clients", &[1, 2, 3]), ("nbr_servers", &[4, 5, 6])],
        );
        let second = TestCase::PerAgent.step_load(&steps, 1).unwrap();
        assert_eq!((second.load.nbr_clients, second.load.nbr_servers), (1, 1));
        assert_eq!(second.topics, vec!["topic-0"]);
        let first = TestCase::PerAgent.step_load(&steps, 0).unwrap();
        assert_eq!((first.load.nbr_clients, first.load.nbr_servers), (1, 4));
    }

    #[test]
    fn per_topic_steps_add_only_new_topics() {
        let steps = steps(TestCase::PerTopic, &[("nbr_topics", &[1, 2, 3])]);
        let first = TestCase::PerTopic.step_load(&steps, 0).unwrap();
        assert_eq!(first.topics, vec!["topic-0"]);
        let second = TestCase::PerTopic.step_load(&steps, 1).unwrap();
        assert_eq!(second.topics, vec!["topic-1"]);
        assert_eq!((second.load.nbr_clients, second.load.nbr_servers), (1, 1));
    }

    #[test]
    fn fanout_steps_start_one_client_only_once() {
        let steps = steps(TestCase::Fanout, &[("nbr_servers", &[4, 5, 6])]);
        let first = TestCase::Fanout.step_load(&steps, 0).unwrap();
        assert_eq!((first.load.nbr_clients, first.load.nbr_servers), (1, 4));
        let second = TestCase::Fanout.step_load(&steps, 1).unwrap();
        assert_eq!((second.load.nbr_clients, second.load.nbr_servers), (0, 1));
    }

    #[test]
    fn broadcast_has_no_incremental_mode() {
        assert!(!TestCase::Broadcast.supports_incremental());
        assert!(matches!(
            TestCase::Broadcast.step_load(&[], 0),
            Err(ConfigError::Unsupported(_))
        ));
    }

    #[test]
    fn forced_call_types() {
        let params = Defaults::default().fill(&ParameterSet::new());
        assert_eq!(
            TestCase::Fanout.normalize(&params).require_str("call_type").unwrap(),
            "rpc-fanout"
        );
        assert_eq!(
            TestCase::PerAgent.normalize(&params).require_str("call_type").unwrap(),
            "rpc-call"
        );
    }

    #[test]
    fn full_load_uses_topic_count_for_topic_shapes() {
        let params = Defaults::default().fill(&ParameterSet::new().with("nbr_topics", 12));
        let load = TestCase::Broadcast.full_load(&params).unwrap();
        assert_eq!(load.topics.len(), 12);
        assert_eq!(load.topics[0], "topic-00");
        assert_eq!(TestCase::PerAgent.full_load(&params).unwrap().topics, vec!["topic-0"]);
    }

    #[test]
    fn only_test_case_one_filters_by_default() {
        let pending = vec![ParameterSet::new().with("nbr_clients", 1).with("nbr_servers", 2)];
        assert!(TestCase::PerAgent.policy(false).select(pending.clone()).is_empty());
        assert_eq!(TestCase::PerAgent.policy(true).select(pending.clone()).len(), 1);
        assert_eq!(TestCase::Fanout.policy(false).select(pending).len(), 1);
    }
}
