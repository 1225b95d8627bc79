use crate::models::{JwtResponse, LoginRequest, NewUser, SignupRequest, UpdateUserRequest, User};
use crate::repository::UserRepository;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use common::auth::{self, AuthError, ROLE_ADMIN, ROLE_USER};
use common::Config;
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("User not found")]
    NotFound,
    #[error("Email and phone number must be unique")]
    Conflict,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Access denied")]
    Forbidden,
}

impl From<RepositoryError> for UserError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => UserError::NotFound,
            RepositoryError::UniqueViolation(_) => UserError::Conflict,
            RepositoryError::CheckViolation(msg) => UserError::InvalidInput(msg),
            _ => UserError::Infrastructure(err.to_string()),
        }
    }
}

impl From<AuthError> for UserError {
    fn from(_: AuthError) -> Self {
        UserError::Forbidden
    }
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db, req))]
    pub async fn register(db: &Database, req: SignupRequest) -> Result<User, UserError> {
        let roles = match req.roles {
            None => vec![ROLE_USER.to_string()],
            Some(roles) => {
                if roles.is_empty() {
                    return Err(UserError::InvalidInput("At least one role is required".into()));
                }
                for role in &roles {
                    if role != ROLE_ADMIN && role != ROLE_USER {
                        return Err(UserError::InvalidInput(format!("Unknown role: {}", role)));
                    }
                }
                roles
            }
        };

        let password_hash = hash_password(&req.password)?;
        let new_user = NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            middle_name: req.middle_name,
            email: req.email,
            phone_number: req.phone_number,
            password_hash,
        };

        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let id = repo.create(&new_user).await?;
        for role in &roles {
            repo.add_role(id, role).await?;
        }

        let user = repo.find_by_id(id).await?.ok_or(UserError::NotFound)?;
        uow.commit().await?;

        Ok(user)
    }

    #[instrument(skip(db, config, req))]
    pub async fn authenticate(
        db: &Database,
        config: &Config,
        req: LoginRequest,
    ) -> Result<JwtResponse, UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        // A missing account and a wrong password look identical to the caller.
        let creds = repo
            .find_credentials_by_email(&req.email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        verify_password(&req.password, &creds.password_hash)?;

        let roles = repo.roles_for(creds.id).await?;
        let token = auth::issue_token(creds.id, &roles, &config.jwt_secret, config.token_ttl_hours)
            .map_err(|e| UserError::Infrastructure(e.to_string()))?;

        Ok(JwtResponse {
            token,
            token_type: "Bearer".into(),
            user_id: creds.id,
            email: creds.email,
            roles,
        })
    }

    #[instrument(skip(db))]
    pub async fn list_users(db: &Database) -> Result<Vec<User>, UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let users = repo.list().await?;
        Ok(users)
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &Database, id: i64) -> Result<User, UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let user = repo.find_by_id(id).await?.ok_or(UserError::NotFound)?;
        Ok(user)
    }

    #[instrument(skip(db, req))]
    pub async fn update_user(
        db: &Database,
        id: i64,
        req: UpdateUserRequest,
    ) -> Result<User, UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        repo.update(id, &req).await?;
        let user = repo.find_by_id(id).await?.ok_or(UserError::NotFound)?;

        uow.commit().await?;
        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn delete_user(db: &Database, id: i64) -> Result<(), UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        repo.delete(id).await?;

        uow.commit().await?;
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Infrastructure(format!("Hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<(), UserError> {
    let parsed = PasswordHash::new(hash).map_err(|_| UserError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| UserError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    fn signup(email: &str, phone: &str, roles: Option<Vec<String>>) -> SignupRequest {
        SignupRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            middle_name: None,
            email: email.into(),
            password: "password123".into(),
            phone_number: phone.into(),
            roles,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_to_user_role() {
        let db = get_test_db().await;

        let user = UserService::register(&db, signup("a@example.com", "+10000000001", None))
            .await
            .unwrap();

        assert_eq!(user.roles, vec![ROLE_USER.to_string()]);
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_role() {
        let db = get_test_db().await;

        let err = UserService::register(
            &db,
            signup("b@example.com", "+10000000002", Some(vec!["SUPERUSER".into()])),
        )
        .await;

        assert!(matches!(err, Err(UserError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let db = get_test_db().await;

        UserService::register(&db, signup("c@example.com", "+10000000003", None))
            .await
            .unwrap();
        let err = UserService::register(&db, signup("c@example.com", "+10000000004", None)).await;

        assert!(matches!(err, Err(UserError::Conflict)));
    }

    #[tokio::test]
    async fn test_authenticate_round_trip() {
        let db = get_test_db().await;
        let config = Config::for_tests();

        let user = UserService::register(
            &db,
            signup("d@example.com", "+10000000005", Some(vec![ROLE_ADMIN.into()])),
        )
        .await
        .unwrap();

        let resp = UserService::authenticate(
            &db,
            &config,
            LoginRequest { email: "d@example.com".into(), password: "password123".into() },
        )
        .await
        .unwrap();

        assert_eq!(resp.user_id, user.id);
        assert_eq!(resp.token_type, "Bearer");
        assert_eq!(resp.roles, vec![ROLE_ADMIN.to_string()]);

        let claims = common::auth::verify_token(&resp.token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let db = get_test_db().await;
        let config = Config::for_tests();

        UserService::register(&db, signup("e@example.com", "+10000000006", None))
            .await
            .unwrap();

        let err = UserService::authenticate(
            &db,
            &config,
            LoginRequest { email: "e@example.com".into(), password: "wrong".into() },
        )
        .await;
        assert!(matches!(err, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email() {
        let db = get_test_db().await;
        let config = Config::for_tests();

        let err = UserService::authenticate(
            &db,
            &config,
            LoginRequest { email: "ghost@example.com".into(), password: "password123".into() },
        )
        .await;
        assert!(matches!(err, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let db = get_test_db().await;

        let user = UserService::register(&db, signup("f@example.com", "+10000000007", None))
            .await
            .unwrap();

        let updated = UserService::update_user(
            &db,
            user.id,
            UpdateUserRequest {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                middle_name: None,
                email: "f2@example.com".into(),
                phone_number: "+10000000008".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.email, "f2@example.com");

        UserService::delete_user(&db, user.id).await.unwrap();
        let err = UserService::get_user(&db, user.id).await;
        assert!(matches!(err, Err(UserError::NotFound)));
    }
}
