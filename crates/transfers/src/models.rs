use serde::{Deserialize, Serialize};

/// One transfer attempt. Transient: nothing of it is persisted beyond the
/// two balance mutations it causes.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TransferRequest {
    pub from_card_id: i64,
    pub to_card_id: i64,
    /// Minor currency units; must be positive.
    pub amount: i64,
}

/// Echo of the committed transfer, returned to the caller unchanged.
#[derive(Debug, Serialize, PartialEq)]
pub struct TransferReceipt {
    pub from_card_id: i64,
    pub to_card_id: i64,
    pub amount: i64,
}
