use crate::models::{NewUser, UpdateUserRequest, User};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    email: String,
    phone_number: String,
}

impl UserRecord {
    fn into_user(self, roles: Vec<String>) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            email: self.email,
            phone_number: self.phone_number,
            roles,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct Credentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

pub(crate) struct UserRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, user: &NewUser) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (first_name, last_name, middle_name, email, phone_number, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn add_role(&mut self, user_id: i64, role: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    pub async fn roles_for(&mut self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(roles)
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, first_name, last_name, middle_name, email, phone_number \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        match record {
            Some(r) => {
                let roles = self.roles_for(r.id).await?;
                Ok(Some(r.into_user(roles)))
            }
            None => Ok(None),
        }
    }

    pub async fn find_credentials_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Credentials>, RepositoryError> {
        let record = sqlx::query_as::<_, Credentials>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record)
    }

    pub async fn list(&mut self) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, first_name, last_name, middle_name, email, phone_number \
             FROM users ORDER BY id",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        let mut result = Vec::with_capacity(records.len());
        for record in records {
            let roles = self.roles_for(record.id).await?;
            result.push(record.into_user(roles));
        }
        Ok(result)
    }

    pub async fn update(&mut self, id: i64, req: &UpdateUserRequest) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $1, last_name = $2, middle_name = $3, \
             email = $4, phone_number = $5 WHERE id = $6",
        )
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.middle_name)
        .bind(&req.email)
        .bind(&req.phone_number)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
