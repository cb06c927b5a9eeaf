use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::user_group::AccessGroup;
use crate::utils::jwt;

/// Authenticated user, extracted from the Bearer token.
/// Used as an extractor by every protected route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_staff: bool,
    pub groups: Vec<AccessGroup>,
}

impl AuthUser {
    /// Staff users pass every group check
    pub fn has_group(&self, group: AccessGroup) -> bool {
        self.is_staff || self.groups.contains(&group)
    }

    pub fn require_group(&self, group: AccessGroup) -> AppResult<()> {
        if self.has_group(group) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User {} is not in group {:?}",
                self.username, group
            )))
        }
    }

    pub fn require_any(&self, groups: &[AccessGroup]) -> AppResult<()> {
        if groups.iter().any(|g| self.has_group(*g)) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User {} is not allowed here",
                self.username
            )))
        }
    }

    pub fn require_staff(&self) -> AppResult<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(AppError::Forbidden("Staff only".to_string()))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract(req).map_err(Error::from))
    }
}

fn extract(req: &HttpRequest) -> AppResult<AuthUser> {
    // 1. Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    // 2. Header as string
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

    // 3. Token (format: "Bearer <token>")
    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized(
            "Invalid Authorization format (expected: Bearer <token>)".to_string(),
        )
    })?;

    // 4. Verify JWT
    let claims = jwt::verify(token).map_err(|e| AppError::Unauthorized(e.to_string()))?;

    // 5. Build AuthUser
    Ok(AuthUser {
        user_id: claims.sub,
        username: claims.username,
        is_staff: claims.is_staff,
        groups: claims.groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user(is_staff: bool, groups: Vec<AccessGroup>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "ana".to_string(),
            is_staff,
            groups,
        }
    }

    #[test]
    fn test_staff_passes_every_group() {
        let staff = user(true, vec![]);
        assert!(staff.require_group(AccessGroup::Sales).is_ok());
        assert!(staff.require_staff().is_ok());
    }

    #[test]
    fn test_group_membership() {
        let operator = user(false, vec![AccessGroup::Production]);
        assert!(operator.require_group(AccessGroup::Production).is_ok());
        assert!(operator.require_group(AccessGroup::Logistics).is_err());
        assert!(operator
            .require_any(&[AccessGroup::Sales, AccessGroup::Production])
            .is_ok());
        assert!(operator.require_staff().is_err());
    }

    #[test]
    fn test_extract_from_bearer_token() {
        let token = jwt::sign(&jwt::Claims::for_user(7, "luis", false, vec![AccessGroup::Sales])).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();

        let auth = extract(&req).unwrap();
        assert_eq!(auth.user_id, 7);
        assert_eq!(auth.groups, vec![AccessGroup::Sales]);
    }

    #[test]
    fn test_missing_header_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(extract(&req), Err(AppError::Unauthorized(_))));
    }
}
