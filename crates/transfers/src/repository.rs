use cards::models::CardStatus;
use database::{self, RepositoryError};
use sqlx::FromRow;

/// Snapshot of a card row read inside the transfer transaction.
#[derive(Debug)]
pub(crate) struct CardForUpdate {
    pub id: i64,
    pub status: CardStatus,
    pub balance: i64,
    pub user_id: i64,
}

#[derive(FromRow)]
struct CardForUpdateRecord {
    id: i64,
    status: String,
    balance: i64,
    user_id: i64,
}

impl TryFrom<CardForUpdateRecord> for CardForUpdate {
    type Error = RepositoryError;

    fn try_from(record: CardForUpdateRecord) -> Result<Self, Self::Error> {
        let status = record
            .status
            .parse::<CardStatus>()
            .map_err(RepositoryError::CheckViolation)?;

        Ok(CardForUpdate {
            id: record.id,
            status,
            balance: record.balance,
            user_id: record.user_id,
        })
    }
}

/// Account-store access for the transfer engine. All calls run on one
/// `UnitOfWork` connection, so the reads and the two balance writes either
/// commit together or not at all.
pub(crate) struct TransferRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> TransferRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn get_for_update(
        &mut self,
        id: i64,
    ) -> Result<Option<CardForUpdate>, RepositoryError> {
        let record = sqlx::query_as::<_, CardForUpdateRecord>(
            "SELECT id, status, balance, user_id FROM cards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(CardForUpdate::try_from).transpose()
    }

    /// Conditional debit: the balance guard re-checks the precondition at
    /// write time, so a balance that changed since `get_for_update` can
    /// never be driven negative.
    pub async fn debit(&mut self, id: i64, amount: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cards SET balance = balance - $1 WHERE id = $2 AND balance >= $1",
        )
        .bind(amount)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "source balance changed concurrently".into(),
            ));
        }
        Ok(())
    }

    pub async fn credit(&mut self, id: i64, amount: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cards SET balance = balance + $1 WHERE id = $2")
            .bind(amount)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "destination card disappeared concurrently".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    async fn setup_card(conn: &mut database::Connection, balance: i64) -> i64 {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (first_name, last_name, email, phone_number, password_hash) \
             VALUES ('Test', 'Owner', $1, $2, 'hash') RETURNING id",
        )
        .bind(format!("owner{}@example.com", nanos))
        .bind(format!("+7{}", nanos % 10_000_000_000))
        .fetch_one(&mut *conn)
        .await
        .unwrap();

        sqlx::query_scalar(
            "INSERT INTO cards (final_date, status, balance, user_id) \
             VALUES ('2027-12-31', 'ACTIVE', $1, $2) RETURNING id",
        )
        .bind(balance)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_for_update() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let card_id = setup_card(uow.connection(), 1_000).await;

        let mut repo = TransferRepository::new(uow.connection());
        let card = repo.get_for_update(card_id).await.unwrap().unwrap();
        assert_eq!(card.balance, 1_000);
        assert_eq!(card.status, CardStatus::Active);

        assert!(repo.get_for_update(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_debit_respects_balance_guard() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let card_id = setup_card(uow.connection(), 500).await;

        let mut repo = TransferRepository::new(uow.connection());
        repo.debit(card_id, 300).await.unwrap();

        let err = repo.debit(card_id, 300).await;
        assert!(matches!(err, Err(RepositoryError::Conflict(_))));

        let card = repo.get_for_update(card_id).await.unwrap().unwrap();
        assert_eq!(card.balance, 200);
    }

    #[tokio::test]
    async fn test_credit() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let card_id = setup_card(uow.connection(), 100).await;

        let mut repo = TransferRepository::new(uow.connection());
        repo.credit(card_id, 50).await.unwrap();

        let card = repo.get_for_update(card_id).await.unwrap().unwrap();
        assert_eq!(card.balance, 150);

        let err = repo.credit(9999, 50).await;
        assert!(matches!(err, Err(RepositoryError::Conflict(_))));
    }
}
