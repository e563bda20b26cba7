//! Unlock requirements and the progress snapshot they are checked against.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::resources::{Resource, ResourcePool};

/// A condition gating a producer unlock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Requirement {
    /// Current balance at least `amount`.
    #[serde(rename_all = "camelCase")]
    ResourceAtLeast { resource: Resource, amount: f64 },
    /// Lifetime earnings at least `amount`.
    #[serde(rename_all = "camelCase")]
    LifetimeAtLeast { resource: Resource, amount: f64 },
    #[serde(rename_all = "camelCase")]
    ProducerOwned { producer: String, count: u64 },
    #[serde(rename_all = "camelCase")]
    TraitAcquired { trait_id: String },
    All { requirements: Vec<Requirement> },
}

/// Read-only view of player progress used to evaluate requirements.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub resources: ResourcePool,
    pub owned: BTreeMap<String, u64>,
    pub traits: BTreeSet<String>,
}

impl Requirement {
    pub fn is_satisfied(&self, progress: &Progress) -> bool {
        match self {
            Requirement::ResourceAtLeast { resource, amount } => {
                progress.resources.amount(*resource) >= *amount
            }
            Requirement::LifetimeAtLeast { resource, amount } => {
                progress.resources.lifetime(*resource) >= *amount
            }
            Requirement::ProducerOwned { producer, count } => {
                progress.owned.get(producer).copied().unwrap_or(0) >= *count
            }
            Requirement::TraitAcquired { trait_id } => progress.traits.contains(trait_id),
            Requirement::All { requirements } => {
                requirements.iter().all(|r| r.is_satisfied(progress))
            }
        }
    }

    /// Producer ids this requirement refers to, for catalog cross-checks.
    pub fn referenced_producers(&self) -> Vec<&str> {
        match self {
            Requirement::ProducerOwned { producer, .. } => vec![producer.as_str()],
            Requirement::All { requirements } => requirements
                .iter()
                .flat_map(|r| r.referenced_producers())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Trait ids this requirement refers to.
    pub fn referenced_traits(&self) -> Vec<&str> {
        match self {
            Requirement::TraitAcquired { trait_id } => vec![trait_id.as_str()],
            Requirement::All { requirements } => requirements
                .iter()
                .flat_map(|r| r.referenced_traits())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> Progress {
        let mut resources = ResourcePool::new();
        resources.credit(Resource::Essence, 120.0);
        resources.debit(Resource::Essence, 100.0).unwrap();
        let mut owned = BTreeMap::new();
        owned.insert("wisp".to_string(), 10);
        Progress {
            resources,
            owned,
            traits: ["focus".to_string()].into(),
        }
    }

    #[test]
    fn test_resource_vs_lifetime() {
        let p = progress();
        let current = Requirement::ResourceAtLeast {
            resource: Resource::Essence,
            amount: 100.0,
        };
        let lifetime = Requirement::LifetimeAtLeast {
            resource: Resource::Essence,
            amount: 100.0,
        };
        assert!(!current.is_satisfied(&p));
        assert!(lifetime.is_satisfied(&p));
    }

    #[test]
    fn test_all_requires_every_branch() {
        let p = progress();
        let req = Requirement::All {
            requirements: vec![
                Requirement::ProducerOwned {
                    producer: "wisp".into(),
                    count: 10,
                },
                Requirement::TraitAcquired {
                    trait_id: "focus".into(),
                },
            ],
        };
        assert!(req.is_satisfied(&p));

        let req = Requirement::All {
            requirements: vec![
                req,
                Requirement::ProducerOwned {
                    producer: "imp".into(),
                    count: 1,
                },
            ],
        };
        assert!(!req.is_satisfied(&p));
        assert_eq!(req.referenced_producers(), vec!["wisp", "imp"]);
        assert_eq!(req.referenced_traits(), vec!["focus"]);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"type":"producerOwned","producer":"wisp","count":5}"#;
        let req: Requirement = serde_json::from_str(json).unwrap();
        assert_eq!(
            req,
            Requirement::ProducerOwned {
                producer: "wisp".into(),
                count: 5
            }
        );
    }
}
