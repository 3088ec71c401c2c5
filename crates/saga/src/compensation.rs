//! Best-effort release of a stock reservation.

use crate::services::InventoryService;

/// Releases a reservation, absorbing any failure.
///
/// By the time compensation runs, either no order was persisted (the
/// hold will expire on its own) or the order's own state change has
/// already committed and must not be undone. In both cases the only
/// remaining action on failure is an operational alert: a stranded
/// reservation ties up stock until the inventory side expires it.
pub async fn release_reservation<I>(inventory: &I, token: &str)
where
    I: InventoryService + ?Sized,
{
    match inventory.release(token).await {
        Ok(()) => {
            metrics::counter!("reservations_released_total").increment(1);
            tracing::info!(token, "reservation released");
        }
        Err(e) => {
            metrics::counter!("reservation_release_failures_total").increment(1);
            tracing::error!(token, error = %e, "failed to release reservation, stock hold is stranded");
        }
    }
}
