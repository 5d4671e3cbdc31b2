#![allow(dead_code)]

use std::collections::HashMap;

use topostream::config::{ConfigFile, RawConfigFile};
use topostream::types::UnresolvedPolicy;
use topostream::{NodeInfo, Resolver};

/// Test payload: an id plus the ids it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: u32,
    pub deps: Vec<u32>,
}

impl Item {
    pub fn info(&self) -> NodeInfo<u32> {
        NodeInfo::new(self.id, self.deps.iter().copied())
    }
}

pub fn item(id: u32, deps: &[u32]) -> Item {
    Item {
        id,
        deps: deps.to_vec(),
    }
}

/// Build items from `(id, deps)` pairs.
pub fn items(specs: &[(u32, &[u32])]) -> Vec<Item> {
    specs.iter().map(|(id, deps)| item(*id, deps)).collect()
}

pub fn ids(items: &[Item]) -> Vec<u32> {
    items.iter().map(|item| item.id).collect()
}

/// Sync resolver reading the id and deps straight off an [`Item`].
pub fn item_resolver() -> Resolver<Item, u32> {
    Resolver::sync(|item: &Item| Ok::<_, anyhow::Error>(item.info()))
}

/// Panics unless every emitted item comes after each of its dependencies.
///
/// Every dependency of an emitted item must itself have been emitted.
pub fn assert_dependency_order(emitted: &[Item]) {
    let position: HashMap<u32, usize> = emitted
        .iter()
        .enumerate()
        .map(|(pos, item)| (item.id, pos))
        .collect();

    for (pos, item) in emitted.iter().enumerate() {
        for dep in &item.deps {
            match position.get(dep) {
                Some(dep_pos) => assert!(
                    *dep_pos < pos,
                    "item {} emitted at {pos} before its dependency {dep} at {dep_pos}",
                    item.id
                ),
                None => panic!("item {} emitted but dependency {dep} never was", item.id),
            }
        }
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config.config.max_in_flight = max;
        self
    }

    pub fn output_buffer(mut self, capacity: usize) -> Self {
        self.config.config.output_buffer = capacity;
        self
    }

    pub fn on_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.config.config.on_unresolved = policy;
        self
    }

    pub fn fields(mut self, id_field: &str, deps_field: &str) -> Self {
        self.config.input.id_field = id_field.to_string();
        self.config.input.deps_field = deps_field.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
