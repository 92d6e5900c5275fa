//! Employment record lifecycle.
//!
//! ```text
//! ACTIVE --soft delete--> SOFT_DELETED --restore--> ACTIVE
//!                         SOFT_DELETED --purge----> PURGED (terminal)
//! ```
//!
//! Both backends read a [`RecordStatus`] inside their write transaction and
//! run it through these checks before mutating, so the precondition and the
//! write commit together. A record in the wrong state is reported as
//! `NotFound` before ownership is considered.

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::policy;
use chrono::NaiveDate;
use shared_types::LifecycleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SoftDelete,
    Restore,
    Purge,
}

impl Transition {
    pub fn required_state(self) -> LifecycleState {
        match self {
            Transition::SoftDelete => LifecycleState::Active,
            Transition::Restore | Transition::Purge => LifecycleState::SoftDeleted,
        }
    }

    pub fn target_state(self) -> LifecycleState {
        match self {
            Transition::SoftDelete => LifecycleState::SoftDeleted,
            Transition::Restore => LifecycleState::Active,
            Transition::Purge => LifecycleState::Purged,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::SoftDelete => "soft_delete",
            Transition::Restore => "restore",
            Transition::Purge => "purge",
        }
    }

    fn wrong_state(self) -> ApiError {
        match self {
            Transition::SoftDelete => {
                ApiError::not_found("Employment record not found or already deleted")
            }
            Transition::Restore | Transition::Purge => {
                ApiError::not_found("Employment record not found in trash")
            }
        }
    }
}

/// State and resolved owner of one stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStatus {
    pub state: LifecycleState,
    pub owner_id: String,
}

pub fn authorize_transition(
    transition: Transition,
    status: &RecordStatus,
    caller: &Identity,
) -> ApiResult<()> {
    if status.state != transition.required_state() {
        return Err(transition.wrong_state());
    }
    policy::ensure_access(caller, &status.owner_id)
}

/// Reads see a record only in the state their view expects
pub fn authorize_read(
    view: LifecycleState,
    status: &RecordStatus,
    caller: &Identity,
) -> ApiResult<()> {
    if status.state != view {
        return Err(match view {
            LifecycleState::SoftDeleted => {
                ApiError::not_found("Employment record not found in trash")
            }
            _ => ApiError::not_found("Employment record not found"),
        });
    }
    policy::ensure_access(caller, &status.owner_id)
}

/// Only ACTIVE records can be edited
pub fn authorize_update(status: &RecordStatus, caller: &Identity) -> ApiResult<()> {
    authorize_read(LifecycleState::Active, status, caller)
}

pub fn validate_dates(start: NaiveDate, end: Option<NaiveDate>) -> ApiResult<()> {
    match end {
        Some(end) if end < start => Err(ApiError::invalid_argument(
            "end_date cannot be earlier than start_date",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use shared_types::Role;

    fn user(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            username: id.to_string(),
            role: Role::User,
        }
    }

    fn status(state: LifecycleState, owner: &str) -> RecordStatus {
        RecordStatus {
            state,
            owner_id: owner.to_string(),
        }
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(Transition::SoftDelete.required_state(), LifecycleState::Active);
        assert_eq!(Transition::SoftDelete.target_state(), LifecycleState::SoftDeleted);
        assert_eq!(Transition::Restore.required_state(), LifecycleState::SoftDeleted);
        assert_eq!(Transition::Restore.target_state(), LifecycleState::Active);
        assert_eq!(Transition::Purge.required_state(), LifecycleState::SoftDeleted);
        assert_eq!(Transition::Purge.target_state(), LifecycleState::Purged);
    }

    #[test]
    fn test_state_is_checked_before_ownership() {
        // Wrong state and wrong owner: the state wins, so nothing leaks
        let err = authorize_transition(
            Transition::SoftDelete,
            &status(LifecycleState::SoftDeleted, "9"),
            &user("1"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = authorize_transition(
            Transition::SoftDelete,
            &status(LifecycleState::Active, "9"),
            &user("1"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_restore_requires_soft_deleted() {
        let err = authorize_transition(
            Transition::Restore,
            &status(LifecycleState::Active, "1"),
            &user("1"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert!(authorize_transition(
            Transition::Restore,
            &status(LifecycleState::SoftDeleted, "1"),
            &user("1"),
        )
        .is_ok());
    }

    #[test]
    fn test_update_requires_active() {
        let err =
            authorize_update(&status(LifecycleState::SoftDeleted, "1"), &user("1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_validate_dates() {
        let start = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert!(validate_dates(start, None).is_ok());
        assert!(validate_dates(start, Some(start)).is_ok());
        let err = validate_dates(start, NaiveDate::from_ymd_opt(2023, 4, 30)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
