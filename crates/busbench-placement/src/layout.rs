//! Per-shard agent counts for each load shape.
//!
//! A shard is paired with one control-bus replica and one controller. The
//! offsets recorded here are the number of agents of the same role placed
//! by earlier shards, so that shards start their machine/endpoint
//! rotation where the previous one stopped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlacementError, PlacementResult};
use crate::shard::{Distribution, distribute};

/// How a test case spreads its load across shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadShape {
    /// Clients and servers split by count; every shard sees all topics.
    PerAgent,
    /// Topics dealt round-robin; one client and one server per topic.
    PerTopic,
    /// Servers split by count; every shard runs the full client set.
    Fanout,
    /// Topics dealt round-robin; clients and servers scaled by the
    /// shard's topic count.
    Broadcast,
}

/// Agent counts requested by one combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Load {
    pub nbr_clients: u32,
    pub nbr_servers: u32,
}

/// What one shard has to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRequest {
    pub shard: usize,
    pub clients: u32,
    pub servers: u32,
    pub client_offset: u32,
    pub server_offset: u32,
    pub topics: Vec<String>,
}

impl ShardRequest {
    pub fn is_idle(&self) -> bool {
        self.topics.is_empty() || (self.clients == 0 && self.servers == 0)
    }
}

impl LoadShape {
    /// Split `load` over `shards` control-bus replicas.
    ///
    /// Shards with nothing to run are left out.
    pub fn shard_requests(
        &self,
        load: Load,
        topics: &[String],
        shards: usize,
    ) -> PlacementResult<Vec<ShardRequest>> {
        if shards == 0 {
            return Err(PlacementError::NoShards);
        }
        let requests: Vec<ShardRequest> = match self {
            LoadShape::PerAgent => {
                let clients = distribute(load.nbr_clients as usize, shards, Distribution::Remainder);
                let servers = distribute(load.nbr_servers as usize, shards, Distribution::Remainder);
                clients
                    .iter()
                    .zip(&servers)
                    .map(|(c, s)| ShardRequest {
                        shard: c.shard,
                        clients: c.len() as u32,
                        servers: s.len() as u32,
                        client_offset: c.offset as u32,
                        server_offset: s.offset as u32,
                        topics: topics.to_vec(),
                    })
                    .collect()
            }
            LoadShape::PerTopic | LoadShape::Broadcast => {
                let (per_client, per_server) = match self {
                    LoadShape::PerTopic => (1, 1),
                    _ => (load.nbr_clients, load.nbr_servers),
                };
                distribute(topics.len(), shards, Distribution::RoundRobin)
                    .iter()
                    .map(|slice| {
                        let n = slice.len() as u32;
                        let before = slice.offset as u32;
                        ShardRequest {
                            shard: slice.shard,
                            clients: n * per_client,
                            servers: n * per_server,
                            client_offset: before * per_client,
                            server_offset: before * per_server,
                            topics: slice.select(topics),
                        }
                    })
                    .collect()
            }
            LoadShape::Fanout => distribute(load.nbr_servers as usize, shards, Distribution::Remainder)
                .iter()
                .map(|s| ShardRequest {
                    shard: s.shard,
                    clients: load.nbr_clients,
                    servers: s.len() as u32,
                    client_offset: s.shard as u32 * load.nbr_clients,
                    server_offset: s.offset as u32,
                    topics: topics.to_vec(),
                })
                // A fanout shard without servers has nothing to fan out to.
                .filter(|r| r.servers > 0)
                .collect(),
        };
        let requests: Vec<ShardRequest> = requests.into_iter().filter(|r| !r.is_idle()).collect();
        debug!(
            shape = ?self,
            shards,
            active = requests.len(),
            "computed shard requests"
        );
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(n: usize) -> Vec<String> {
        busbench_core::TopicSet::new(n).into_vec()
    }

    fn load(nbr_clients: u32, nbr_servers: u32) -> Load {
        Load {
            nbr_clients,
            nbr_servers,
        }
    }

    #[test]
    fn per_agent_splits_counts_with_running_offsets() {
        let reqs = LoadShape::PerAgent
            .shard_requests(load(10, 3), &topics(1), 3)
            .unwrap();
        assert_eq!(reqs.len(), 3);
        assert_eq!(
            reqs.iter().map(|r| r.clients).collect::<Vec<_>>(),
            vec![4, 3, 3]
        );
        assert_eq!(
            reqs.iter().map(|r| r.client_offset).collect::<Vec<_>>(),
            vec![0, 4, 7]
        );
        assert_eq!(
            reqs.iter().map(|r| r.server_offset).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(reqs.iter().all(|r| r.topics == vec!["topic-0".to_string()]));
    }

    #[test]
    fn per_agent_drops_empty_shards() {
        let reqs = LoadShape::PerAgent
            .shard_requests(load(1, 1), &topics(1), 4)
            .unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].shard, 0);
    }

    #[test]
    fn per_topic_offsets_sum_previous_shards() {
        let reqs = LoadShape::PerTopic
            .shard_requests(load(0, 0), &topics(5), 2)
            .unwrap();
        assert_eq!(reqs[0].topics, vec!["topic-0", "topic-2", "topic-4"]);
        assert_eq!(reqs[1].topics, vec!["topic-1", "topic-3"]);
        assert_eq!((reqs[1].clients, reqs[1].servers), (2, 2));
        assert_eq!((reqs[1].client_offset, reqs[1].server_offset), (3, 3));
    }

    #[test]
    fn fanout_replicates_clients_and_drops_serverless_shards() {
        let reqs = LoadShape::Fanout
            .shard_requests(load(1, 2), &topics(1), 3)
            .unwrap();
        assert_eq!(reqs.len(), 2);
        assert!(reqs.iter().all(|r| r.clients == 1 && r.servers == 1));
        assert_eq!(reqs[1].client_offset, 1);
        assert_eq!(reqs[1].server_offset, 1);
    }

    #[test]
    fn broadcast_scales_by_topics() {
        let reqs = LoadShape::Broadcast
            .shard_requests(load(2, 3), &topics(3), 2)
            .unwrap();
        assert_eq!((reqs[0].clients, reqs[0].servers), (4, 6));
        assert_eq!((reqs[1].clients, reqs[1].servers), (2, 3));
        assert_eq!((reqs[1].client_offset, reqs[1].server_offset), (4, 6));
    }

    #[test]
    fn no_topics_means_no_shards() {
        for shape in [LoadShape::PerAgent, LoadShape::PerTopic, LoadShape::Fanout, LoadShape::Broadcast] {
            assert!(shape.shard_requests(load(4, 4), &[], 2).unwrap().is_empty());
        }
    }

    #[test]
    fn zero_replicas_is_an_error() {
        assert!(matches!(
            LoadShape::PerAgent.shard_requests(load(1, 1), &topics(1), 0),
            Err(PlacementError::NoShards)
        ));
    }
}
