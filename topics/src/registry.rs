//! Topic name → manager registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{TopicDocumentation, TopicManager};

#[derive(Clone, Default)]
pub struct TopicManagers {
    managers: BTreeMap<String, Arc<dyn TopicManager>>,
}

impl TopicManagers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `manager` under `topic`, replacing any previous one.
    pub fn register(&mut self, topic: impl Into<String>, manager: Arc<dyn TopicManager>) {
        self.managers.insert(topic.into(), manager);
    }

    pub fn with(mut self, topic: impl Into<String>, manager: Arc<dyn TopicManager>) -> Self {
        self.register(topic, manager);
        self
    }

    pub fn get(&self, topic: &str) -> Option<Arc<dyn TopicManager>> {
        self.managers.get(topic).cloned()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.managers.contains_key(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.managers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Documentation of every registered topic, keyed by topic name.
    pub fn documentation(&self) -> BTreeMap<String, TopicDocumentation> {
        self.managers
            .iter()
            .map(|(topic, manager)| (topic.clone(), manager.documentation()))
            .collect()
    }
}
