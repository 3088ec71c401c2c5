//! The supervised notification listener task.

use std::time::Duration;

use common::{OrderId, PickingId};
use domain::OrderStatus;
use futures_util::StreamExt;
use order_store::{Notification, NotificationSource, OrderStore, channels};
use saga::{InventoryService, StatusMachine, WarehouseService};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Delay between reconnect attempts after a lost subscription.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Long-lived listener over the store's notification channels.
///
/// One listener runs per service instance. It owns its subscription
/// and retries indefinitely on connection loss; order/warehouse
/// consistency depends on it, so giving up is not an option. Handler
/// failures are absorbed at the dispatch boundary so one bad
/// notification never stops the loop.
pub struct EventListener<N, S, I, W>
where
    N: NotificationSource,
    S: OrderStore,
    I: InventoryService,
    W: WarehouseService,
{
    source: N,
    store: S,
    status: StatusMachine<S, I>,
    warehouse: W,
}

/// Handle to a started listener with an explicit stop lifecycle.
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Signals the listener to stop and waits for the task to finish.
    ///
    /// Stopping is prompt even while the listener is waiting out a
    /// reconnect delay.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl<N, S, I, W> EventListener<N, S, I, W>
where
    N: NotificationSource + Send + Sync + 'static,
    S: OrderStore + Clone + Send + Sync + 'static,
    I: InventoryService + Send + Sync + 'static,
    W: WarehouseService + Send + Sync + 'static,
{
    /// Creates a listener over the given source, store, and
    /// collaborators.
    pub fn new(source: N, store: S, inventory: I, warehouse: W) -> Self {
        let status = StatusMachine::new(store.clone(), inventory);
        Self {
            source,
            store,
            status,
            warehouse,
        }
    }

    /// Spawns the listener loop and returns its lifecycle handle.
    pub fn start(self) -> ListenerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        ListenerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let mut stream = match self.source.subscribe(&channels::ALL).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to subscribe to notification channels");
                    if wait_for_retry(&mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };
            tracing::info!("listening for order notifications");

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return;
                        }
                    }
                    item = stream.next() => match item {
                        Some(Ok(notification)) => self.dispatch(notification).await,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "notification stream failed");
                            break;
                        }
                        None => {
                            tracing::warn!("notification stream ended");
                            break;
                        }
                    },
                }
            }

            if wait_for_retry(&mut shutdown).await {
                return;
            }
        }
    }

    /// Routes one notification to its handler. Never fails: handler
    /// errors are logged and absorbed here.
    async fn dispatch(&self, notification: Notification) {
        metrics::counter!("listener_notifications_total").increment(1);

        let id = match Uuid::parse_str(notification.payload.trim()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    channel = %notification.channel,
                    payload = %notification.payload,
                    error = %e,
                    "notification payload is not an identifier"
                );
                return;
            }
        };

        match notification.channel.as_str() {
            channels::ORDER_CREATED => self.on_order_created(OrderId::from_uuid(id)).await,
            channels::ORDER_APPROVED => self.on_order_approved(OrderId::from_uuid(id)).await,
            channels::ORDER_DELIVERED => self.on_order_delivered(OrderId::from_uuid(id)).await,
            channels::PICKING_COMPLETED => {
                self.on_picking_completed(PickingId::from_uuid(id)).await
            }
            other => tracing::debug!(channel = other, "notification on unhandled channel"),
        }
    }

    /// Hook for future extension; creation needs no reaction yet.
    async fn on_order_created(&self, order_id: OrderId) {
        tracing::debug!(%order_id, "order created");
    }

    /// Asks the warehouse to pick an approved order. The approval is
    /// already committed; a warehouse outage must not undo it, so
    /// failures are logged only.
    async fn on_order_approved(&self, order_id: OrderId) {
        match self.store.get_order(order_id).await {
            Ok(Some(order)) => {
                if let Err(e) = self
                    .warehouse
                    .confirm_picking(order_id, order.reservation_token.as_deref())
                    .await
                {
                    tracing::warn!(%order_id, error = %e, "failed to confirm picking for approved order");
                }
            }
            Ok(None) => tracing::warn!(%order_id, "approved order not found"),
            Err(e) => tracing::warn!(%order_id, error = %e, "failed to load approved order"),
        }
    }

    /// Hook for future extension; delivery needs no reaction yet.
    async fn on_order_delivered(&self, order_id: OrderId) {
        tracing::debug!(%order_id, "order delivered");
    }

    /// Marks the picked order as prepared. No retry is scheduled: the
    /// warehouse redelivers through its own policy, and re-entering
    /// `PREPARADO` is a no-op on redelivery.
    async fn on_picking_completed(&self, picking_id: PickingId) {
        let picking = match self.warehouse.get_picking(picking_id).await {
            Ok(Some(picking)) => picking,
            Ok(None) => {
                tracing::warn!(%picking_id, "picking not found");
                return;
            }
            Err(e) => {
                tracing::warn!(%picking_id, error = %e, "failed to load picking");
                return;
            }
        };

        let Some(order_id) = picking.order_id else {
            tracing::warn!(%picking_id, "picking has no associated order");
            return;
        };

        if let Err(e) = self
            .status
            .change_status(
                order_id,
                OrderStatus::Preparado,
                None,
                Some("picking completed".to_string()),
            )
            .await
        {
            tracing::warn!(%order_id, %picking_id, error = %e, "failed to mark order prepared");
        }
    }
}

/// Waits out the reconnect delay; returns true when shutdown was
/// requested instead.
async fn wait_for_retry(shutdown: &mut watch::Receiver<bool>) -> bool {
    match tokio::time::timeout(RECONNECT_DELAY, shutdown.changed()).await {
        Ok(Ok(())) => *shutdown.borrow(),
        Ok(Err(_)) => true,
        Err(_) => false,
    }
}
