// ============================================================================
// SERVICE : USERS
// ============================================================================
//
// Description:
//   Accounts, access groups, login and password recovery by security
//   question.
//
// Recovery:
//   1. start  {dni}            -> question text
//   2. answer {dni, answer}    -> single-use token, valid 1 hour
//   3. reset  {token, new_password}
//
// Notes:
//   - Answers are stored hashed and compared trimmed + lower-cased
//   - Inactive users cannot log in nor recover their password
//   - At startup an empty users table gets the configured staff account
//
// ============================================================================

use chrono::Duration;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::dto::{
    AuthResponse, ChangePasswordRequest, CreateUserRequest, LoginRequest, RecoveryAnswerRequest,
    RecoveryQuestion, RecoveryResetRequest, RecoveryStartRequest, RecoveryToken, SecurityQuestionRequest,
    UpdateUserRequest, UserResponse,
};
use crate::models::user_group::{self, AccessGroup};
use crate::models::{password_reset_tokens, security_question, users};
use crate::services::now;
use crate::utils::{jwt, password};

const TOKEN_LIFETIME_HOURS: i64 = 1;

pub const DEFAULT_QUESTIONS: [&str; 4] = [
    "What is the name of your first pet?",
    "In which city were you born?",
    "What is your mother's maiden name?",
    "What was the name of your primary school?",
];

pub struct UserService;

impl UserService {
    // ===== Authentication =====

    pub async fn login(db: &DatabaseConnection, request: LoginRequest) -> AppResult<AuthResponse> {
        // 1. Same message for unknown user and wrong password
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = users::Entity::find()
            .filter(users::Column::Username.eq(&request.username))
            .one(db)
            .await?
            .ok_or_else(invalid)?;

        // 2. Password
        if !password::verify_password(&request.password, &user.password_hash)? {
            warn!("⚠️ Failed login for {}", request.username);
            return Err(invalid());
        }

        // 3. Active account
        if !user.is_active {
            return Err(AppError::Forbidden("This account is disabled".to_string()));
        }

        // 4. Token carries the groups
        let response = Self::user_response(db, user).await?;
        let claims = jwt::Claims::for_user(response.id, &response.username, response.is_staff, response.groups.clone());
        let token = jwt::sign(&claims).map_err(|e| AppError::Internal(e.to_string()))?;

        info!("🔑 {} logged in", response.username);
        Ok(AuthResponse { token, user: response })
    }

    pub async fn me(db: &DatabaseConnection, user_id: i32) -> AppResult<UserResponse> {
        let user = Self::get_model(db, user_id).await?;
        Self::user_response(db, user).await
    }

    pub async fn change_password(
        db: &DatabaseConnection,
        user_id: i32,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        let user = Self::get_model(db, user_id).await?;

        if !password::verify_password(&request.current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }

        let hash = password::hash_password(&request.new_password)?;
        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(hash);
        active.update(db).await?;

        Ok(())
    }

    // ===== Administration =====

    pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<UserResponse>> {
        let all = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(db)
            .await?;

        let mut responses = Vec::with_capacity(all.len());
        for user in all {
            responses.push(Self::user_response(db, user).await?);
        }
        Ok(responses)
    }

    pub async fn create_user(db: &DatabaseConnection, request: CreateUserRequest) -> AppResult<UserResponse> {
        // 1. Uniqueness
        Self::check_unique(db, None, Some(&request.username), request.dni.as_deref()).await?;
        if let Some(question_id) = request.security_question_id {
            Self::get_question(db, question_id).await?;
        }

        // 2. Hashes
        let password_hash = password::hash_password(&request.password)?;
        let answer_hash = match request.security_answer.as_deref().filter(|a| !a.trim().is_empty()) {
            Some(answer) => Some(password::hash_answer(answer)?),
            None => None,
        };

        // 3. User + groups in one transaction
        let txn = db.begin().await?;
        let user = users::ActiveModel {
            username: Set(request.username),
            password_hash: Set(password_hash),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            email: Set(request.email),
            dni: Set(request.dni),
            security_question_id: Set(request.security_question_id),
            security_answer_hash: Set(answer_hash),
            is_staff: Set(request.is_staff),
            is_active: Set(true),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        Self::replace_groups(&txn, user.id, &request.groups).await?;
        txn.commit().await?;

        info!("👤 User {} created", user.username);
        Self::user_response(db, user).await
    }

    pub async fn update_user(
        db: &DatabaseConnection,
        user_id: i32,
        request: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        let user = Self::get_model(db, user_id).await?;
        Self::check_unique(db, Some(user.id), None, request.dni.as_deref()).await?;
        if let Some(question_id) = request.security_question_id {
            Self::get_question(db, question_id).await?;
        }

        let answer_hash = match request.security_answer.as_deref().filter(|a| !a.trim().is_empty()) {
            Some(answer) => Some(password::hash_answer(answer)?),
            None => None,
        };

        let txn = db.begin().await?;
        let mut active: users::ActiveModel = user.into();
        if let Some(first_name) = request.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = request.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(dni) = request.dni {
            active.dni = Set(Some(dni));
        }
        if let Some(question_id) = request.security_question_id {
            active.security_question_id = Set(Some(question_id));
        }
        if let Some(hash) = answer_hash {
            active.security_answer_hash = Set(Some(hash));
        }
        if let Some(is_staff) = request.is_staff {
            active.is_staff = Set(is_staff);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        let user = active.update(&txn).await?;

        if let Some(groups) = request.groups {
            Self::replace_groups(&txn, user.id, &groups).await?;
        }
        txn.commit().await?;

        Self::user_response(db, user).await
    }

    /// Staff cannot delete their own account
    pub async fn delete_user(db: &DatabaseConnection, user_id: i32, acting_user_id: i32) -> AppResult<()> {
        if user_id == acting_user_id {
            return Err(AppError::Conflict("You cannot delete your own account".to_string()));
        }
        let user = Self::get_model(db, user_id).await?;

        let txn = db.begin().await?;
        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;
        password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;
        users::Entity::delete_by_id(user.id).exec(&txn).await?;
        txn.commit().await?;

        info!("🗑️ User {} deleted", user.username);
        Ok(())
    }

    pub async fn list_questions(db: &DatabaseConnection) -> AppResult<Vec<security_question::Model>> {
        Ok(security_question::Entity::find()
            .order_by_asc(security_question::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn create_question(
        db: &DatabaseConnection,
        request: SecurityQuestionRequest,
    ) -> AppResult<security_question::Model> {
        Ok(security_question::ActiveModel {
            text: Set(request.text.trim().to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    // ===== Password recovery =====

    pub async fn recovery_start(
        db: &DatabaseConnection,
        request: RecoveryStartRequest,
    ) -> AppResult<RecoveryQuestion> {
        let user = Self::recoverable_user(db, &request.dni).await?;
        let question_id = user
            .security_question_id
            .filter(|_| user.security_answer_hash.is_some())
            .ok_or_else(|| AppError::validation("No security question configured for this user"))?;

        let question = Self::get_question(db, question_id).await?;
        Ok(RecoveryQuestion {
            dni: request.dni,
            question: question.text,
        })
    }

    pub async fn recovery_answer(
        db: &DatabaseConnection,
        request: RecoveryAnswerRequest,
    ) -> AppResult<RecoveryToken> {
        let user = Self::recoverable_user(db, &request.dni).await?;
        let stored = user
            .security_answer_hash
            .as_deref()
            .ok_or_else(|| AppError::validation("No security question configured for this user"))?;

        if !password::verify_answer(&request.answer, stored)? {
            warn!("⚠️ Wrong security answer for user {}", user.username);
            return Err(AppError::Unauthorized("Incorrect answer".to_string()));
        }

        let created_at = now();
        let token = password_reset_tokens::ActiveModel {
            user_id: Set(user.id),
            token: Set(Uuid::new_v4().to_string()),
            expires_at: Set(created_at + Duration::hours(TOKEN_LIFETIME_HOURS)),
            used: Set(false),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(RecoveryToken {
            token: token.token,
            expires_at: token.expires_at,
        })
    }

    pub async fn recovery_reset(db: &DatabaseConnection, request: RecoveryResetRequest) -> AppResult<()> {
        let hash = password::hash_password(&request.new_password)?;
        let txn = db.begin().await?;

        // 1. Token exists, unused, unexpired
        let token = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(&request.token))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::validation("Invalid recovery token"))?;

        if token.used {
            return Err(AppError::validation("This recovery token was already used"));
        }
        if token.expires_at < now() {
            return Err(AppError::validation("This recovery token has expired"));
        }

        // 2. Burn it; only one redemption flips `used`
        Self::consume_token(&txn, token.id).await?;

        // 3. New password
        let user = Self::get_model(&txn, token.user_id).await?;
        let mut active_user: users::ActiveModel = user.into();
        active_user.password_hash = Set(hash);
        let user = active_user.update(&txn).await?;
        txn.commit().await?;

        info!("🔑 Password reset for {}", user.username);
        Ok(())
    }

    async fn consume_token<C: ConnectionTrait>(conn: &C, token_id: i32) -> AppResult<()> {
        let burned = password_reset_tokens::Entity::update_many()
            .col_expr(password_reset_tokens::Column::Used, Expr::value(true))
            .filter(password_reset_tokens::Column::Id.eq(token_id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .exec(conn)
            .await?;

        if burned.rows_affected != 1 {
            return Err(AppError::validation("This recovery token was already used"));
        }
        Ok(())
    }

    // ===== Bootstrap =====

    /// Seeds the default security questions and, on an empty users table,
    /// the configured staff account.
    pub async fn ensure_bootstrap(db: &DatabaseConnection, config: &AppConfig) -> AppResult<()> {
        if security_question::Entity::find().count(db).await? == 0 {
            for text in DEFAULT_QUESTIONS {
                security_question::ActiveModel {
                    text: Set(text.to_string()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
            info!("Seeded {} security questions", DEFAULT_QUESTIONS.len());
        }

        if users::Entity::find().count(db).await? > 0 {
            return Ok(());
        }

        match (&config.admin_username, &config.admin_password) {
            (Some(username), Some(admin_password)) => {
                users::ActiveModel {
                    username: Set(username.clone()),
                    password_hash: Set(password::hash_password(admin_password)?),
                    first_name: Set(None),
                    last_name: Set(None),
                    email: Set(None),
                    dni: Set(None),
                    security_question_id: Set(None),
                    security_answer_hash: Set(None),
                    is_staff: Set(true),
                    is_active: Set(true),
                    created_at: Set(now()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                info!("👤 Staff account {} created", username);
            }
            _ => warn!("⚠️ No users yet and ADMIN_USERNAME / ADMIN_PASSWORD not set"),
        }

        Ok(())
    }

    // ===== Helpers =====

    pub async fn groups_for<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Vec<AccessGroup>, DbErr> {
        let rows = user_group::Entity::find()
            .filter(user_group::Column::UserId.eq(user_id))
            .order_by_asc(user_group::Column::Id)
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|row| row.group).collect())
    }

    async fn user_response<C: ConnectionTrait>(conn: &C, user: users::Model) -> AppResult<UserResponse> {
        let groups = Self::groups_for(conn, user.id).await?;
        Ok(UserResponse {
            id: user.id,
            full_name: user.full_name(),
            username: user.username,
            email: user.email,
            dni: user.dni,
            security_question_id: user.security_question_id,
            is_staff: user.is_staff,
            is_active: user.is_active,
            groups,
        })
    }

    async fn replace_groups<C: ConnectionTrait>(conn: &C, user_id: i32, groups: &[AccessGroup]) -> Result<(), DbErr> {
        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;

        let mut seen: Vec<AccessGroup> = Vec::new();
        for group in groups {
            if seen.contains(group) {
                continue;
            }
            seen.push(*group);
            user_group::ActiveModel {
                user_id: Set(user_id),
                group: Set(*group),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
        Ok(())
    }

    async fn check_unique(
        db: &DatabaseConnection,
        exclude_id: Option<i32>,
        username: Option<&str>,
        dni: Option<&str>,
    ) -> AppResult<()> {
        if let Some(username) = username {
            let taken = users::Entity::find()
                .filter(users::Column::Username.eq(username))
                .one(db)
                .await?;
            if taken.is_some_and(|u| Some(u.id) != exclude_id) {
                return Err(AppError::Conflict(format!("Username {} already exists", username)));
            }
        }
        if let Some(dni) = dni {
            let taken = users::Entity::find()
                .filter(users::Column::Dni.eq(dni))
                .one(db)
                .await?;
            if taken.is_some_and(|u| Some(u.id) != exclude_id) {
                return Err(AppError::Conflict(format!("DNI {} is already registered", dni)));
            }
        }
        Ok(())
    }

    async fn recoverable_user(db: &DatabaseConnection, dni: &str) -> AppResult<users::Model> {
        users::Entity::find()
            .filter(users::Column::Dni.eq(dni))
            .filter(users::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("No active user with this DNI".to_string()))
    }

    async fn get_model<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    async fn get_question(db: &DatabaseConnection, question_id: i32) -> AppResult<security_question::Model> {
        security_question::Entity::find_by_id(question_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Security question", question_id))
    }
}
