use crate::models::{Card, CardPage, CardSearchQuery, CardStatus, CreateCardRequest, NewCard};
use crate::repository::{CardRepository, CardSearchFilter};
use common::auth::{AuthError, AuthUser};
use database::{Database, RepositoryError};
use tracing::instrument;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Card not found")]
    NotFound,
    #[error("Access denied")]
    Forbidden,
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for CardError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CardError::NotFound,
            RepositoryError::CheckViolation(msg) => CardError::InvalidInput(msg),
            RepositoryError::UniqueViolation(msg) | RepositoryError::Conflict(msg) => {
                CardError::Conflict(msg)
            }
            RepositoryError::Infrastructure(e) => CardError::Infrastructure(e.to_string()),
        }
    }
}

impl From<AuthError> for CardError {
    fn from(_: AuthError) -> Self {
        CardError::Forbidden
    }
}

pub struct CardService;

impl CardService {
    #[instrument(skip(db, req))]
    pub async fn create_card(db: &Database, req: CreateCardRequest) -> Result<Card, CardError> {
        if req.balance < 0 {
            return Err(CardError::InvalidInput("Balance cannot be negative".into()));
        }

        let new_card = NewCard {
            final_date: req.final_date,
            status: req.status.unwrap_or(CardStatus::Active),
            balance: req.balance,
            user_id: req.user_id,
        };

        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let id = repo.create(&new_card).await?;
        let card = repo.find_by_id(id).await?.ok_or(CardError::NotFound)?;

        uow.commit().await?;
        Ok(card)
    }

    #[instrument(skip(db))]
    pub async fn list_cards(db: &Database) -> Result<Vec<Card>, CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let cards = repo.list().await?;
        Ok(cards)
    }

    #[instrument(skip(db))]
    pub async fn get_card(db: &Database, id: i64) -> Result<Card, CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let card = repo.find_by_id(id).await?.ok_or(CardError::NotFound)?;
        Ok(card)
    }

    /// Cards of one user. Admins may look at anyone; everyone else only at
    /// their own cards.
    #[instrument(skip(db, requester))]
    pub async fn list_cards_for_user(
        db: &Database,
        user_id: i64,
        requester: &AuthUser,
    ) -> Result<Vec<Card>, CardError> {
        if requester.id != user_id && !requester.is_admin() {
            return Err(CardError::Forbidden);
        }

        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let cards = repo.list_by_user(user_id).await?;
        Ok(cards)
    }

    #[instrument(skip(db))]
    pub async fn block_card(db: &Database, id: i64) -> Result<Card, CardError> {
        Self::set_status(db, id, CardStatus::Blocked).await
    }

    #[instrument(skip(db))]
    pub async fn activate_card(db: &Database, id: i64) -> Result<Card, CardError> {
        Self::set_status(db, id, CardStatus::Active).await
    }

    async fn set_status(db: &Database, id: i64, target: CardStatus) -> Result<Card, CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let card = repo.find_by_id(id).await?.ok_or(CardError::NotFound)?;
        if card.status == CardStatus::Outdated {
            return Err(CardError::InvalidInput(
                "An outdated card cannot change status".into(),
            ));
        }
        if card.status == target {
            return Ok(card);
        }

        repo.update_status(id, target).await?;
        let card = repo.find_by_id(id).await?.ok_or(CardError::NotFound)?;

        uow.commit().await?;
        Ok(card)
    }

    #[instrument(skip(db))]
    pub async fn delete_card(db: &Database, id: i64) -> Result<(), CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        repo.delete(id).await?;

        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(db, query))]
    pub async fn search(db: &Database, query: CardSearchQuery) -> Result<CardPage, CardError> {
        if query.user_id.is_none() && query.status.is_none() && query.final_date.is_none() {
            return Err(CardError::InvalidInput(
                "At least one of user_id, status or final_date is required".into(),
            ));
        }

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let filter = CardSearchFilter {
            user_id: query.user_id,
            status: query.status,
            final_date: query.final_date,
        };

        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let total = repo.count(&filter).await?;
        let items = repo.search(&filter, i64::from(per_page), offset).await?;

        Ok(CardPage { items, page, per_page, total })
    }
}
