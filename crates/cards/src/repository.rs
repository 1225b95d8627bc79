use crate::models::{Card, CardStatus, NewCard};
use chrono::NaiveDate;
use database::{self, RepositoryError};
use sqlx::{FromRow, QueryBuilder, Sqlite};

#[derive(FromRow)]
struct CardRecord {
    id: i64,
    final_date: NaiveDate,
    status: String,
    balance: i64,
    user_id: i64,
}

impl TryFrom<CardRecord> for Card {
    type Error = RepositoryError;

    fn try_from(record: CardRecord) -> Result<Self, Self::Error> {
        let status = record
            .status
            .parse::<CardStatus>()
            .map_err(RepositoryError::CheckViolation)?;

        Ok(Card {
            id: record.id,
            final_date: record.final_date,
            status,
            balance: record.balance,
            user_id: record.user_id,
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct CardSearchFilter {
    pub user_id: Option<i64>,
    pub status: Option<CardStatus>,
    pub final_date: Option<NaiveDate>,
}

pub(crate) struct CardRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> CardRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, card: &NewCard) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO cards (final_date, status, balance, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(card.final_date)
        .bind(card.status.as_str())
        .bind(card.balance)
        .bind(card.user_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Card>, RepositoryError> {
        let record = sqlx::query_as::<_, CardRecord>(
            "SELECT id, final_date, status, balance, user_id FROM cards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Card::try_from).transpose()
    }

    pub async fn list(&mut self) -> Result<Vec<Card>, RepositoryError> {
        let records = sqlx::query_as::<_, CardRecord>(
            "SELECT id, final_date, status, balance, user_id FROM cards ORDER BY id",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Card::try_from).collect()
    }

    pub async fn list_by_user(&mut self, user_id: i64) -> Result<Vec<Card>, RepositoryError> {
        let records = sqlx::query_as::<_, CardRecord>(
            "SELECT id, final_date, status, balance, user_id FROM cards \
             WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Card::try_from).collect()
    }

    pub async fn update_status(
        &mut self,
        id: i64,
        status: CardStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cards SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn search(
        &mut self,
        filter: &CardSearchFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Card>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, final_date, status, balance, user_id FROM cards",
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let records = qb
            .build_query_as::<CardRecord>()
            .fetch_all(&mut *self.conn)
            .await?;

        records.into_iter().map(Card::try_from).collect()
    }

    pub async fn count(&mut self, filter: &CardSearchFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM cards");
        push_filters(&mut qb, filter);

        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(total)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CardSearchFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ");
        qb.push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.as_str());
    }
    if let Some(final_date) = filter.final_date {
        qb.push(" AND final_date = ");
        qb.push_bind(final_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    async fn setup_user(conn: &mut database::Connection) -> i64 {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        sqlx::query_scalar(
            "INSERT INTO users (first_name, last_name, email, phone_number, password_hash) \
             VALUES ('Test', 'Owner', $1, $2, 'hash') RETURNING id",
        )
        .bind(format!("owner{}@example.com", nanos))
        .bind(format!("+7{}", nanos % 10_000_000_000))
        .fetch_one(&mut *conn)
        .await
        .unwrap()
    }

    fn new_card(user_id: i64, balance: i64, status: CardStatus) -> NewCard {
        NewCard {
            final_date: NaiveDate::from_ymd_opt(2027, 12, 31).unwrap(),
            status,
            balance,
            user_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection()).await;

        let mut repo = CardRepository::new(uow.connection());
        let id = repo.create(&new_card(user_id, 10_000, CardStatus::Active)).await.unwrap();
        assert!(id > 0);

        let card = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(card.balance, 10_000);
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.user_id, user_id);
    }

    #[tokio::test]
    async fn test_negative_balance_rejected_by_schema() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection()).await;

        let mut repo = CardRepository::new(uow.connection());
        let err = repo.create(&new_card(user_id, -1, CardStatus::Active)).await;
        assert!(matches!(err, Err(RepositoryError::CheckViolation(_))));
    }

    #[tokio::test]
    async fn test_list_by_user() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let owner = setup_user(uow.connection()).await;
        let other = setup_user(uow.connection()).await;

        let mut repo = CardRepository::new(uow.connection());
        repo.create(&new_card(owner, 100, CardStatus::Active)).await.unwrap();
        repo.create(&new_card(owner, 200, CardStatus::Blocked)).await.unwrap();
        repo.create(&new_card(other, 300, CardStatus::Active)).await.unwrap();

        let cards = repo.list_by_user(owner).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.user_id == owner));
    }

    #[tokio::test]
    async fn test_update_status() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection()).await;

        let mut repo = CardRepository::new(uow.connection());
        let id = repo.create(&new_card(user_id, 100, CardStatus::Active)).await.unwrap();

        repo.update_status(id, CardStatus::Blocked).await.unwrap();
        let card = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(card.status, CardStatus::Blocked);

        let err = repo.update_status(9999, CardStatus::Active).await;
        assert!(matches!(err, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_search_with_filters_and_paging() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let owner = setup_user(uow.connection()).await;

        let mut repo = CardRepository::new(uow.connection());
        for i in 0..5 {
            let status = if i % 2 == 0 { CardStatus::Active } else { CardStatus::Blocked };
            repo.create(&new_card(owner, i * 100, status)).await.unwrap();
        }

        let filter = CardSearchFilter {
            user_id: Some(owner),
            status: Some(CardStatus::Active),
            final_date: None,
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 3);

        let page = repo.search(&filter, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        // Sorted id DESC: page two holds the oldest remaining card.
        let rest = repo.search(&filter, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(page.iter().all(|c| c.status == CardStatus::Active));
        assert!(page[0].id > page[1].id);
    }

    #[tokio::test]
    async fn test_delete_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection()).await;

        let mut repo = CardRepository::new(uow.connection());
        let id = repo.create(&new_card(user_id, 100, CardStatus::Active)).await.unwrap();

        repo.delete(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(repo.delete(id).await, Err(RepositoryError::NotFound)));
    }
}
