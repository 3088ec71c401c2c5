//! Order status state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The lifecycle status of an order.
///
/// ```text
/// PENDIENTE ──► APROBADO ──► PREPARADO ──► EN_RUTA ──► ENTREGADO
///     │             │            │            │
///     └─────────────┴────────────┴────────────┴──► ANULADO / RECHAZADO
/// ```
///
/// `EN_RUTA` is only reachable from `PREPARADO`. Every other forward
/// transition is permitted from any non-terminal status; stricter
/// guards belong to calling policy. `ENTREGADO`, `ANULADO`, and
/// `RECHAZADO` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, awaiting approval.
    #[default]
    #[serde(rename = "PENDIENTE")]
    Pendiente,

    /// Order approved for fulfillment.
    #[serde(rename = "APROBADO")]
    Aprobado,

    /// Warehouse picking completed, order is packed.
    #[serde(rename = "PREPARADO")]
    Preparado,

    /// Order is out for delivery.
    #[serde(rename = "EN_RUTA")]
    EnRuta,

    /// Order delivered (terminal).
    #[serde(rename = "ENTREGADO")]
    Entregado,

    /// Order cancelled (terminal).
    #[serde(rename = "ANULADO")]
    Anulado,

    /// Order rejected (terminal).
    #[serde(rename = "RECHAZADO")]
    Rechazado,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Entregado | OrderStatus::Anulado | OrderStatus::Rechazado
        )
    }

    /// Returns true for the two cancelling statuses, which release the
    /// order's stock reservation when entered.
    pub fn is_cancelling(&self) -> bool {
        matches!(self, OrderStatus::Anulado | OrderStatus::Rechazado)
    }

    /// Returns true if `CancelOrder` is legal from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pendiente | OrderStatus::Aprobado)
    }

    /// Returns true if a transition to `target` is legal from this status.
    ///
    /// `PENDIENTE` is never a target: it is the initial status only.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match target {
            OrderStatus::Pendiente => false,
            OrderStatus::EnRuta => *self == OrderStatus::Preparado,
            _ => true,
        }
    }

    /// Returns the status code as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pendiente => "PENDIENTE",
            OrderStatus::Aprobado => "APROBADO",
            OrderStatus::Preparado => "PREPARADO",
            OrderStatus::EnRuta => "EN_RUTA",
            OrderStatus::Entregado => "ENTREGADO",
            OrderStatus::Anulado => "ANULADO",
            OrderStatus::Rechazado => "RECHAZADO",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A status code outside the closed set.
#[derive(Debug, Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDIENTE" => Ok(OrderStatus::Pendiente),
            "APROBADO" => Ok(OrderStatus::Aprobado),
            "PREPARADO" => Ok(OrderStatus::Preparado),
            "EN_RUTA" => Ok(OrderStatus::EnRuta),
            "ENTREGADO" => Ok(OrderStatus::Entregado),
            "ANULADO" => Ok(OrderStatus::Anulado),
            "RECHAZADO" => Ok(OrderStatus::Rechazado),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 7] = [
        OrderStatus::Pendiente,
        OrderStatus::Aprobado,
        OrderStatus::Preparado,
        OrderStatus::EnRuta,
        OrderStatus::Entregado,
        OrderStatus::Anulado,
        OrderStatus::Rechazado,
    ];

    #[test]
    fn test_default_status_is_pendiente() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pendiente);
    }

    #[test]
    fn test_en_ruta_requires_preparado() {
        assert!(OrderStatus::Preparado.can_transition_to(OrderStatus::EnRuta));

        for status in ALL {
            if status != OrderStatus::Preparado {
                assert!(
                    !status.can_transition_to(OrderStatus::EnRuta),
                    "{status} must not transition to EN_RUTA"
                );
            }
        }
    }

    #[test]
    fn test_pendiente_is_never_a_target() {
        for status in ALL {
            assert!(!status.can_transition_to(OrderStatus::Pendiente));
        }
    }

    #[test]
    fn test_terminal_statuses_admit_nothing() {
        for terminal in [
            OrderStatus::Entregado,
            OrderStatus::Anulado,
            OrderStatus::Rechazado,
        ] {
            assert!(terminal.is_terminal());
            for target in ALL {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_cancelling_targets_reachable_from_any_non_terminal() {
        for status in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(OrderStatus::Anulado));
            assert!(status.can_transition_to(OrderStatus::Rechazado));
        }
    }

    #[test]
    fn test_can_cancel_only_from_pendiente_and_aprobado() {
        assert!(OrderStatus::Pendiente.can_cancel());
        assert!(OrderStatus::Aprobado.can_cancel());
        for status in [
            OrderStatus::Preparado,
            OrderStatus::EnRuta,
            OrderStatus::Entregado,
            OrderStatus::Anulado,
            OrderStatus::Rechazado,
        ] {
            assert!(!status.can_cancel());
        }
    }

    #[test]
    fn test_is_cancelling() {
        assert!(OrderStatus::Anulado.is_cancelling());
        assert!(OrderStatus::Rechazado.is_cancelling());
        assert!(!OrderStatus::Entregado.is_cancelling());
        assert!(!OrderStatus::Pendiente.is_cancelling());
    }

    #[test]
    fn test_status_codes_roundtrip() {
        for status in ALL {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_unknown_status_code_is_rejected() {
        let result = "DESPACHADO".parse::<OrderStatus>();
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_uses_status_codes() {
        let json = serde_json::to_string(&OrderStatus::EnRuta).unwrap();
        assert_eq!(json, "\"EN_RUTA\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::EnRuta);
    }
}
