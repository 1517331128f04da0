// =============================================================================
// Execution Engine: turns an actionable signal into a signed market order
// and hands it to the exchange gateway, with dry-run support
// =============================================================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::delta::{ClientOrderIds, OrderGateway, OrderRequest, OrderSigner};
use crate::error::BotResult;
use crate::types::{AccountMode, Side};

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// Outcome of a successful dispatch.  Failures come back as
/// `BotError::SignSubmit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecutionResult {
    /// Exchange accepted the order (HTTP 200).
    Placed {
        client_order_id: String,
        response: serde_json::Value,
    },
    /// Dry run: signed but never transmitted.
    Simulated {
        client_order_id: String,
        sim_order_id: String,
    },
}

impl ExecutionResult {
    pub fn client_order_id(&self) -> &str {
        match self {
            Self::Placed { client_order_id, .. } | Self::Simulated { client_order_id, .. } => {
                client_order_id
            }
        }
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed { client_order_id, .. } => write!(f, "Placed({client_order_id})"),
            Self::Simulated {
                client_order_id,
                sim_order_id,
            } => write!(f, "Simulated({client_order_id}, sim={sim_order_id})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Static order parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSettings {
    pub product_id: u64,
    pub trade_size: f64,
    pub order_path: String,
    pub account_mode: AccountMode,
}

/// Ties the signer and the exchange gateway together.
pub struct ExecutionEngine {
    gateway: Arc<dyn OrderGateway>,
    signer: OrderSigner,
    order_ids: ClientOrderIds,
    settings: OrderSettings,
}

impl ExecutionEngine {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        signer: OrderSigner,
        order_ids: ClientOrderIds,
        settings: OrderSettings,
    ) -> Self {
        Self {
            gateway,
            signer,
            order_ids,
            settings,
        }
    }

    pub fn settings(&self) -> &OrderSettings {
        &self.settings
    }

    /// Build, sign and (in live mode) transmit a market order for `side`.
    ///
    /// A fresh client order id is drawn on every call, so a retry on the next
    /// tick never collides with the failed attempt.
    pub async fn execute_signal(&self, side: Side) -> BotResult<ExecutionResult> {
        let client_order_id = self.order_ids.next_id();
        let order = OrderRequest::market(
            self.settings.product_id,
            self.settings.trade_size,
            side,
            client_order_id.clone(),
        );
        let signed = self.signer.sign(&order, &self.settings.order_path)?;

        info!(
            side = %order.side(),
            size = order.size(),
            product_id = order.product_id(),
            client_order_id = %order.client_order_id(),
            account_mode = %self.settings.account_mode,
            "order signed"
        );

        if self.settings.account_mode == AccountMode::Demo {
            let sim_order_id = Uuid::new_v4().to_string();
            info!(client_order_id = %client_order_id, sim_order_id = %sim_order_id, "dry run, order not transmitted");
            return Ok(ExecutionResult::Simulated {
                client_order_id,
                sim_order_id,
            });
        }

        debug!(path = %signed.path, "sending live order");
        match self.gateway.submit(&signed).await {
            Ok(ack) => {
                info!(side = %side, client_order_id = %client_order_id, status = ack.status, "order placed");
                Ok(ExecutionResult::Placed {
                    client_order_id,
                    response: ack.body,
                })
            }
            Err(e) => {
                warn!(side = %side, client_order_id = %client_order_id, error = %e, "order placement failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("gateway", &"<OrderGateway>")
            .field("signer", &self.signer)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::delta::client::SubmitResponse;
    use crate::delta::{OrderGateway, SignedRequest};
    use crate::error::{BotError, BotResult};

    /// Records every request and answers from a script (default: accept).
    #[derive(Default)]
    pub struct RecordingGateway {
        pub sent: Mutex<Vec<SignedRequest>>,
        pub script: Mutex<VecDeque<BotResult<SubmitResponse>>>,
    }

    impl RecordingGateway {
        pub fn scripted(results: impl IntoIterator<Item = BotResult<SubmitResponse>>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                script: Mutex::new(results.into_iter().collect()),
            }
        }

        pub fn ok() -> BotResult<SubmitResponse> {
            Ok(SubmitResponse {
                status: 200,
                body: serde_json::json!({"success": true}),
            })
        }

        pub fn rejected(status: u16) -> BotResult<SubmitResponse> {
            Err(BotError::SignSubmit {
                status: Some(status),
                message: "rejected".into(),
            })
        }

        pub fn sent(&self) -> Vec<SignedRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderGateway for RecordingGateway {
        async fn submit(&self, request: &SignedRequest) -> BotResult<SubmitResponse> {
            self.sent.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(Self::ok)
        }
    }
}
