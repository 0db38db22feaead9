//! The topic manager contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use overlay_transactions::Transaction;
use overlay_types::{AdmittanceInstructions, SubmitMode};

use crate::TopicManagerError;

/// Human-readable description of a topic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDocumentation {
    pub name: String,
    pub short_description: String,
    pub documentation: String,
}

#[async_trait]
pub trait TopicManager: Send + Sync {
    /// Decide which outputs of `tx` are admitted and which of the
    /// previously admitted coins it spends (`previous_coins`, input indices)
    /// stay tracked. `coins_removed` in the result is computed by the caller.
    async fn identify_admissible_outputs(
        &self,
        tx: &Transaction,
        previous_coins: &[u32],
        mode: SubmitMode,
    ) -> Result<AdmittanceInstructions, TopicManagerError>;

    fn documentation(&self) -> TopicDocumentation {
        TopicDocumentation::default()
    }
}
