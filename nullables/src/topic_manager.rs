//! Nullable topic manager: scripted admittance decisions.

use async_trait::async_trait;
use overlay_topics::{TopicDocumentation, TopicManager, TopicManagerError};
use overlay_transactions::Transaction;
use overlay_types::{AdmittanceInstructions, SubmitMode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a [`NullTopicManager`] answers.
#[derive(Clone, Debug)]
pub enum TopicBehaviour {
    /// Admit every output and retain every previous coin.
    AdmitAll,
    /// Admit the listed output indices (those in range) and retain nothing.
    AdmitOutputs(Vec<u32>),
    /// Like `AdmitAll`, answering only after the delay.
    AdmitAllAfter(Duration),
    /// Admit nothing.
    AdmitNone,
    /// Fail with `TopicManagerError::Rejected`.
    Reject(String),
    /// Never answer.
    Hang,
}

pub struct NullTopicManager {
    behaviour: Mutex<TopicBehaviour>,
    calls: AtomicUsize,
    modes: Mutex<Vec<SubmitMode>>,
}

impl NullTopicManager {
    pub fn new(behaviour: TopicBehaviour) -> Self {
        Self {
            behaviour: Mutex::new(behaviour),
            calls: AtomicUsize::new(0),
            modes: Mutex::new(Vec::new()),
        }
    }

    pub fn admit_all() -> Self {
        Self::new(TopicBehaviour::AdmitAll)
    }

    pub fn set_behaviour(&self, behaviour: TopicBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// Number of evaluations requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Modes of every evaluation requested so far.
    pub fn modes(&self) -> Vec<SubmitMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopicManager for NullTopicManager {
    async fn identify_admissible_outputs(
        &self,
        tx: &Transaction,
        previous_coins: &[u32],
        mode: SubmitMode,
    ) -> Result<AdmittanceInstructions, TopicManagerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);
        let behaviour = self.behaviour.lock().unwrap().clone();
        let admit_all = || AdmittanceInstructions {
            outputs_to_admit: (0..tx.outputs.len() as u32).collect(),
            coins_to_retain: previous_coins.to_vec(),
            ..Default::default()
        };
        match behaviour {
            TopicBehaviour::AdmitAll => Ok(admit_all()),
            TopicBehaviour::AdmitAllAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(admit_all())
            }
            TopicBehaviour::AdmitOutputs(indices) => Ok(AdmittanceInstructions {
                outputs_to_admit: indices
                    .into_iter()
                    .filter(|i| (*i as usize) < tx.outputs.len())
                    .collect(),
                ..Default::default()
            }),
            TopicBehaviour::AdmitNone => Ok(AdmittanceInstructions::default()),
            TopicBehaviour::Reject(reason) => Err(TopicManagerError::Rejected(reason)),
            TopicBehaviour::Hang => std::future::pending().await,
        }
    }

    fn documentation(&self) -> TopicDocumentation {
        TopicDocumentation {
            name: "null".into(),
            short_description: "scripted topic manager for tests".into(),
            documentation: String::new(),
        }
    }
}
