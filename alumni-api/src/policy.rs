use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use shared_types::Role;

/// The single ownership predicate: admins reach everything, users reach
/// what resolves to their own user id.
pub fn can_access(role: Role, caller_id: &str, owner_id: &str) -> bool {
    role.is_admin() || caller_id == owner_id
}

pub fn ensure_access(caller: &Identity, owner_id: &str) -> ApiResult<()> {
    if can_access(caller.role, &caller.user_id, owner_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have permission to access this record",
        ))
    }
}

pub fn ensure_admin(caller: &Identity) -> ApiResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin role required"))
    }
}

/// Owner restriction to apply to a listing. `None` means unrestricted.
pub fn owner_filter(caller: &Identity) -> Option<String> {
    if caller.is_admin() {
        None
    } else {
        Some(caller.user_id.clone())
    }
}

/// Decide who owns an uploaded file.
///
/// Admins upload on behalf of someone and must name them. Users always own
/// their uploads and may only name themselves.
pub fn resolve_file_owner(caller: &Identity, target_user_id: Option<&str>) -> ApiResult<String> {
    let target = target_user_id.map(str::trim).filter(|t| !t.is_empty());

    match (caller.is_admin(), target) {
        (true, Some(target)) => Ok(target.to_string()),
        (true, None) => Err(ApiError::invalid_argument(
            "target_user_id is required when an admin uploads a file",
        )),
        (false, None) => Ok(caller.user_id.clone()),
        (false, Some(target)) if target == caller.user_id => Ok(caller.user_id.clone()),
        (false, Some(_)) => Err(ApiError::forbidden(
            "Users cannot upload files on behalf of another user",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn caller(id: &str, role: Role) -> Identity {
        Identity {
            user_id: id.to_string(),
            username: format!("user-{}", id),
            role,
        }
    }

    #[test]
    fn test_admin_reaches_everything() {
        assert!(can_access(Role::Admin, "1", "2"));
        assert!(can_access(Role::Admin, "1", "1"));
    }

    #[test]
    fn test_user_reaches_only_own() {
        assert!(can_access(Role::User, "7", "7"));
        assert!(!can_access(Role::User, "7", "8"));
        // Symmetric: neither user reaches the other's records
        assert!(!can_access(Role::User, "8", "7"));
    }

    #[test]
    fn test_ensure_access_is_forbidden() {
        let err = ensure_access(&caller("7", Role::User), "8").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(ensure_access(&caller("7", Role::User), "7").is_ok());
    }

    #[test]
    fn test_owner_filter() {
        assert_eq!(owner_filter(&caller("1", Role::Admin)), None);
        assert_eq!(owner_filter(&caller("5", Role::User)), Some("5".to_string()));
    }

    #[test]
    fn test_resolve_file_owner() {
        let admin = caller("1", Role::Admin);
        let user = caller("5", Role::User);

        assert_eq!(resolve_file_owner(&admin, Some("5")).unwrap(), "5");
        assert_eq!(
            resolve_file_owner(&admin, None).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(resolve_file_owner(&user, None).unwrap(), "5");
        assert_eq!(resolve_file_owner(&user, Some("5")).unwrap(), "5");
        assert_eq!(
            resolve_file_owner(&user, Some("6")).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
    }
}
