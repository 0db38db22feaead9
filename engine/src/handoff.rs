//! Single-slot delivery of a submission's acknowledgment.
//!
//! Each submission gets its own oneshot channel. The sending half is
//! consumed on delivery, so an acknowledgment is delivered at most once; the
//! receiving half is consumed by [`PendingSteak::wait`], so it is never
//! reused across calls.

use std::time::Duration;

use overlay_types::{Steak, TxId};
use tokio::sync::oneshot;

use crate::SubmitError;

type Delivery = Result<Steak, SubmitError>;

pub(crate) fn channel(txid: TxId) -> (SteakSender, PendingSteak) {
    let (sender, receiver) = oneshot::channel();
    (
        SteakSender { txid, sender },
        PendingSteak { txid, receiver },
    )
}

pub(crate) struct SteakSender {
    txid: TxId,
    sender: oneshot::Sender<Delivery>,
}

impl SteakSender {
    pub(crate) fn deliver(self, result: Delivery) {
        if self.sender.send(result).is_err() {
            tracing::debug!(txid = %self.txid, "submitter stopped waiting before delivery");
        }
    }
}

/// An acknowledgment that is still being evaluated.
#[derive(Debug)]
pub struct PendingSteak {
    txid: TxId,
    receiver: oneshot::Receiver<Delivery>,
}

impl PendingSteak {
    pub fn txid(&self) -> TxId {
        self.txid
    }

    /// Wait up to `deadline` for the acknowledgment.
    ///
    /// Expiry yields [`SubmitError::Timeout`] and stops the waiting only; the
    /// evaluation keeps running and still applies its result to the store.
    pub async fn wait(self, deadline: Duration) -> Result<Steak, SubmitError> {
        match tokio::time::timeout(deadline, self.receiver).await {
            Err(_) => Err(SubmitError::Timeout(deadline)),
            Ok(Err(_)) => Err(SubmitError::Abandoned),
            Ok(Ok(result)) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_types::AdmittanceInstructions;

    #[tokio::test]
    async fn test_delivered_steak_is_returned() {
        let (sender, pending) = channel(TxId::ZERO);
        let mut steak = Steak::new();
        steak.insert("tm_a".into(), AdmittanceInstructions::default());
        sender.deliver(Ok(steak.clone()));
        assert_eq!(pending.wait(Duration::from_secs(1)).await.unwrap(), steak);
    }

    #[tokio::test]
    async fn test_dropped_sender_is_abandoned() {
        let (sender, pending) = channel(TxId::ZERO);
        drop(sender);
        assert!(matches!(
            pending.wait(Duration::from_secs(1)).await,
            Err(SubmitError::Abandoned)
        ));
    }

    #[tokio::test]
    async fn test_silent_sender_times_out() {
        let (_sender, pending) = channel(TxId::ZERO);
        let deadline = Duration::from_millis(20);
        match pending.wait(deadline).await {
            Err(SubmitError::Timeout(d)) => assert_eq!(d, deadline),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delivery_after_timeout_is_dropped() {
        let (sender, pending) = channel(TxId::ZERO);
        let _ = pending.wait(Duration::from_millis(1)).await;
        sender.deliver(Ok(Steak::new()));
    }
}
