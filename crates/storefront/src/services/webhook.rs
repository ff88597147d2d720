//! Payment webhook verifier and dispatcher.
//!
//! A delivery moves through `received -> verified -> dispatched`; a bad
//! signature ends it at `rejected` before anything is read or written.
//!
//! Once a delivery is authentic it is acknowledged even when fulfillment
//! fails, so the provider does not redeliver a charge that was already
//! captured. Those failures are logged at ERROR with the event id, snapshot id
//! and vendor payload, and leave a `failed` order record behind for
//! reconciliation.
//!
//! Duplicates are suppressed twice: the event id is claimed before dispatch,
//! and the snapshot can only be consumed once. A claim only short-circuits
//! once its dispatch completed; a claim left behind by a delivery that died
//! mid-dispatch is resumed by the next redelivery.

use std::sync::Arc;

use thiserror::Error;

use geoart_core::{OrderStatus, Price, SnapshotId, UserId};

use crate::db::{EventClaim, OrderStore, RepositoryError, SnapshotStore};
use crate::models::{CheckoutSnapshot, NewOrder};
use crate::payments::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSessionObject, SignatureError, StripeEvent,
    WebhookVerifier,
};
use crate::services::cart::CartService;
use crate::services::fulfillment::{FulfillmentLine, FulfillmentService};

/// Errors that stop a delivery from being acknowledged.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// Our own store failed before dispatch; the provider should redeliver.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What happened to an authentic delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// An event type this endpoint does not act on.
    Ignored,
    /// A completed session that has not been paid.
    AwaitingPayment,
    /// The event or its snapshot was already processed.
    Duplicate,
    /// A vendor order was placed.
    Dispatched { vendor_order_id: String },
    /// Payment was captured but no vendor order exists; needs an operator.
    NeedsAttention,
}

#[derive(Clone)]
pub struct WebhookService {
    verifier: WebhookVerifier,
    snapshots: Arc<dyn SnapshotStore>,
    orders: Arc<dyn OrderStore>,
    fulfillment: FulfillmentService,
    cart: CartService,
}

impl WebhookService {
    #[must_use]
    pub fn new(
        verifier: WebhookVerifier,
        snapshots: Arc<dyn SnapshotStore>,
        orders: Arc<dyn OrderStore>,
        fulfillment: FulfillmentService,
        cart: CartService,
    ) -> Self {
        Self {
            verifier,
            snapshots,
            orders,
            fulfillment,
            cart,
        }
    }

    /// Authenticate and process one delivery.
    ///
    /// # Errors
    ///
    /// `Signature` if the delivery is not authentic, `Repository` if the
    /// store failed before dispatch (the event claim is released first).
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = self.verifier.verify(payload, signature).inspect_err(|e| {
            tracing::warn!(error = %e, "Webhook signature verification failed");
        })?;
        self.process(&event).await
    }

    #[tracing::instrument(skip_all, fields(event_id = %event.id, event_type = %event.event_type))]
    async fn process(&self, event: &StripeEvent) -> Result<WebhookOutcome, WebhookError> {
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            tracing::info!("Ignoring unhandled webhook event type");
            return Ok(WebhookOutcome::Ignored);
        }

        let session = match event.checkout_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Completed event does not contain a checkout session");
                return Ok(WebhookOutcome::NeedsAttention);
            }
        };
        if !session.is_paid() {
            tracing::info!(
                session_id = %session.id,
                payment_status = ?session.payment_status,
                "Checkout completed without payment; not dispatching"
            );
            return Ok(WebhookOutcome::AwaitingPayment);
        }

        let claim = self.orders.claim_event(&event.id, &event.event_type).await?;
        match claim {
            EventClaim::Completed => {
                tracing::info!("Duplicate webhook delivery suppressed");
                return Ok(WebhookOutcome::Duplicate);
            }
            EventClaim::Pending => {
                tracing::warn!("Resuming webhook event left unfinished by an earlier delivery");
            }
            EventClaim::Claimed => {}
        }

        match self.dispatch(event, &session, claim).await {
            Ok(outcome) => {
                if let Err(e) = self.orders.complete_event(&event.id).await {
                    tracing::error!(error = %e, "Failed to mark webhook event completed");
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release) = self.orders.release_event(&event.id).await {
                    tracing::error!(error = %release, "Failed to release webhook event claim");
                }
                Err(e.into())
            }
        }
    }

    async fn dispatch(
        &self,
        event: &StripeEvent,
        session: &CheckoutSessionObject,
        claim: EventClaim,
    ) -> Result<WebhookOutcome, RepositoryError> {
        let metadata_user = session.user_id().map(UserId::new);
        let session_total = session
            .amount_total
            .map_or(Price::ZERO, Price::from_minor_units);

        let Some(snapshot_id) = session
            .snapshot_ref()
            .and_then(|r| r.parse::<SnapshotId>().ok())
        else {
            self.record_failure(
                event,
                metadata_user,
                None,
                session_total,
                "checkout session has no valid snapshot reference".to_owned(),
            )
            .await;
            return Ok(WebhookOutcome::NeedsAttention);
        };

        let Some(snapshot) = self.snapshots.get(snapshot_id).await? else {
            self.record_failure(
                event,
                metadata_user,
                None,
                session_total,
                format!("checkout snapshot {snapshot_id} not found"),
            )
            .await;
            return Ok(WebhookOutcome::NeedsAttention);
        };

        if metadata_user.as_ref().is_some_and(|user| *user != snapshot.user_id) {
            tracing::warn!(
                snapshot_id = %snapshot.id,
                "Session metadata user differs from snapshot owner; using snapshot owner"
            );
        }

        if !self.snapshots.mark_consumed(snapshot.id).await? {
            if claim == EventClaim::Pending {
                tracing::warn!(
                    snapshot_id = %snapshot.id,
                    "Snapshot consumed by an unfinished delivery; vendor order may be missing"
                );
            } else {
                tracing::info!(snapshot_id = %snapshot.id, "Snapshot already consumed");
            }
            return Ok(WebhookOutcome::Duplicate);
        }

        Ok(self.fulfill(event, session, &snapshot).await)
    }

    async fn fulfill(
        &self,
        event: &StripeEvent,
        session: &CheckoutSessionObject,
        snapshot: &CheckoutSnapshot,
    ) -> WebhookOutcome {
        let Some(address) = snapshot
            .shipping_address
            .clone()
            .or_else(|| session.collected_shipping_address())
        else {
            self.record_failure(
                event,
                Some(snapshot.user_id.clone()),
                Some(snapshot.id),
                snapshot.totals.total,
                "no shipping address on snapshot or checkout session".to_owned(),
            )
            .await;
            return WebhookOutcome::NeedsAttention;
        };

        let lines: Vec<FulfillmentLine> = snapshot.items.iter().map(FulfillmentLine::from).collect();
        match self.fulfillment.submit_order(&lines, &address).await {
            Ok(submitted) => {
                let record = NewOrder {
                    user_id: snapshot.user_id.clone(),
                    snapshot_id: Some(snapshot.id),
                    event_id: Some(event.id.clone()),
                    external_id: Some(submitted.external_id.clone()),
                    vendor_order_id: Some(submitted.vendor_order_id.clone()),
                    total: snapshot.totals.total,
                    status: OrderStatus::Submitted,
                    failure_detail: None,
                };
                if let Err(e) = self.orders.insert(record).await {
                    tracing::error!(
                        snapshot_id = %snapshot.id,
                        vendor_order_id = %submitted.vendor_order_id,
                        error = %e,
                        "Vendor order placed but local record failed"
                    );
                }

                let item_ids: Vec<_> = snapshot.items.iter().map(|item| item.id).collect();
                if let Err(e) = self.cart.remove_consumed(&snapshot.user_id, &item_ids).await {
                    tracing::warn!(snapshot_id = %snapshot.id, error = %e, "Failed to clear purchased cart items");
                }

                tracing::info!(
                    snapshot_id = %snapshot.id,
                    vendor_order_id = %submitted.vendor_order_id,
                    "Payment dispatched to print vendor"
                );
                WebhookOutcome::Dispatched {
                    vendor_order_id: submitted.vendor_order_id,
                }
            }
            Err(e) => {
                let detail = match e.vendor_details() {
                    Some(details) => format!("{e}: {details}"),
                    None => e.to_string(),
                };
                self.record_failure(
                    event,
                    Some(snapshot.user_id.clone()),
                    Some(snapshot.id),
                    snapshot.totals.total,
                    detail,
                )
                .await;
                WebhookOutcome::NeedsAttention
            }
        }
    }

    /// Log a post-payment failure and leave a `failed` order record.
    async fn record_failure(
        &self,
        event: &StripeEvent,
        user_id: Option<UserId>,
        snapshot_id: Option<SnapshotId>,
        total: Price,
        detail: String,
    ) {
        tracing::error!(
            event_id = %event.id,
            snapshot_id = ?snapshot_id.map(|id| id.to_string()),
            detail = %detail,
            "Paid checkout could not be fulfilled; manual reconciliation required"
        );

        let Some(user_id) = user_id else {
            return;
        };
        let record = NewOrder {
            user_id,
            snapshot_id,
            event_id: Some(event.id.clone()),
            external_id: None,
            vendor_order_id: None,
            total,
            status: OrderStatus::Failed,
            failure_detail: Some(detail),
        };
        if let Err(e) = self.orders.insert(record).await {
            tracing::error!(event_id = %event.id, error = %e, "Failed to record failed order");
        }
    }
}
