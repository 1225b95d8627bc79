use crate::models::{TransferRequest, TransferReceipt};
use crate::repository::TransferRepository;
use cards::models::CardStatus;
use common::auth::AuthUser;
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Card {0} not found")]
    NotFound(i64),
    #[error("Requester does not own both cards")]
    OwnershipMismatch,
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Both cards must be active")]
    InactiveCard,
    #[error("Source and destination card are the same")]
    SameCardTransfer,
    #[error("Insufficient funds on the source card")]
    InsufficientFunds,
    #[error("Concurrent modification, retry the transfer")]
    Conflict,
    #[error("Database error: {0}")]
    Infrastructure(String),
}

impl From<RepositoryError> for TransferError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // A row that vanished or changed between read and write is a
            // lost race, not a missing card: the caller may retry.
            RepositoryError::Conflict(_) | RepositoryError::NotFound => TransferError::Conflict,
            _ => TransferError::Infrastructure(err.to_string()),
        }
    }
}

pub struct TransferService;

impl TransferService {
    /// Moves `amount` between two cards of the requester.
    ///
    /// All preconditions are checked against rows read inside the same
    /// transaction that performs the writes; any failure drops the unit of
    /// work, so no partial state is ever committed. Conservation holds for
    /// every committed transfer: the source loses exactly what the
    /// destination gains.
    #[instrument(skip(db, requester), fields(requester_id = requester.id))]
    pub async fn transfer(
        db: &Database,
        requester: &AuthUser,
        req: TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        let mut uow = db.begin().await?;
        let mut repo = TransferRepository::new(uow.connection());

        let from = repo
            .get_for_update(req.from_card_id)
            .await?
            .ok_or(TransferError::NotFound(req.from_card_id))?;
        let to = repo
            .get_for_update(req.to_card_id)
            .await?
            .ok_or(TransferError::NotFound(req.to_card_id))?;

        if from.user_id != requester.id || to.user_id != requester.id {
            return Err(TransferError::OwnershipMismatch);
        }
        if req.amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }
        if from.status != CardStatus::Active || to.status != CardStatus::Active {
            return Err(TransferError::InactiveCard);
        }
        if from.id == to.id {
            return Err(TransferError::SameCardTransfer);
        }
        if from.balance < req.amount {
            return Err(TransferError::InsufficientFunds);
        }

        repo.debit(from.id, req.amount).await?;
        repo.credit(to.id, req.amount).await?;

        uow.commit().await?;

        tracing::info!(
            from = req.from_card_id,
            to = req.to_card_id,
            amount = req.amount,
            "transfer committed"
        );

        Ok(TransferReceipt {
            from_card_id: req.from_card_id,
            to_card_id: req.to_card_id,
            amount: req.amount,
        })
    }
}
