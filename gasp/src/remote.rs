//! The other side of a sync session.

use std::sync::Arc;

use async_trait::async_trait;

use overlay_types::{GraphId, Outpoint};

use crate::messages::{GaspNode, InitialRequest, InitialResponse, NodeResponse};
use crate::{GaspError, GaspResponder};

/// A peer answering GASP requests for one topic.
#[async_trait]
pub trait GaspRemote: Send + Sync {
    async fn get_initial_response(
        &self,
        request: InitialRequest,
    ) -> Result<InitialResponse, GaspError>;

    /// Fetch the node at `outpoint`, tagged with `graph_id`.
    async fn request_node(
        &self,
        graph_id: GraphId,
        outpoint: Outpoint,
    ) -> Result<GaspNode, GaspError>;

    /// Push one of our nodes; the answer lists inputs the peer still needs.
    async fn submit_node(&self, node: GaspNode) -> Result<Option<NodeResponse>, GaspError>;
}

/// Talks to a responder living in the same process.
#[derive(Clone)]
pub struct InProcessRemote {
    responder: Arc<GaspResponder>,
}

impl InProcessRemote {
    pub fn new(responder: Arc<GaspResponder>) -> Self {
        Self { responder }
    }
}

#[async_trait]
impl GaspRemote for InProcessRemote {
    async fn get_initial_response(
        &self,
        request: InitialRequest,
    ) -> Result<InitialResponse, GaspError> {
        self.responder.get_initial_response(&request)
    }

    async fn request_node(
        &self,
        graph_id: GraphId,
        outpoint: Outpoint,
    ) -> Result<GaspNode, GaspError> {
        self.responder.provide_foreign_gasp_node(graph_id, &outpoint)
    }

    async fn submit_node(&self, node: GaspNode) -> Result<Option<NodeResponse>, GaspError> {
        self.responder.receive_node(node).await
    }
}
