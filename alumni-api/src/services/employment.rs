use crate::auth::Identity;
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::lifecycle::{self, RecordStatus, Transition};
use crate::policy;
use crate::query::{ListParams, Page};
use crate::store::{AlumniStore, EmploymentFilter, EmploymentStore};
use shared_types::{
    CreateEmploymentRequest, EmploymentRecord, LifecycleState, UpdateEmploymentRequest,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct EmploymentService {
    store: Arc<dyn EmploymentStore>,
    alumni: Arc<dyn AlumniStore>,
}

fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(ApiError::invalid_argument(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

fn validate_create(request: &CreateEmploymentRequest) -> ApiResult<()> {
    require_text("alumni_id", &request.alumni_id)?;
    require_text("company_name", &request.company_name)?;
    require_text("job_title", &request.job_title)?;
    require_text("employment_status", &request.employment_status)?;
    lifecycle::validate_dates(request.start_date, request.end_date)
}

fn validate_update(changes: &UpdateEmploymentRequest) -> ApiResult<()> {
    let required = [
        ("company_name", &changes.company_name),
        ("job_title", &changes.job_title),
        ("employment_status", &changes.employment_status),
    ];
    for (field, value) in required {
        if let Some(value) = value {
            require_text(field, value)?;
        }
    }
    Ok(())
}

impl EmploymentService {
    pub fn new(store: Arc<dyn EmploymentStore>, alumni: Arc<dyn AlumniStore>) -> Self {
        Self { store, alumni }
    }

    /// Owner of an alumni; a missing alumni is a bad reference, not a 404
    async fn alumni_owner(&self, alumni_id: &str) -> ApiResult<String> {
        match self.alumni.get(alumni_id).await {
            Ok(alumni) => Ok(alumni.user_id),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(ApiError::invalid_argument(
                "alumni_id does not reference an existing alumni",
            )),
            Err(err) => Err(err),
        }
    }

    pub async fn create(
        &self,
        caller: &Identity,
        request: &CreateEmploymentRequest,
    ) -> ApiResult<EmploymentRecord> {
        validate_create(request)?;
        let owner_id = self.alumni_owner(&request.alumni_id).await?;
        policy::ensure_access(caller, &owner_id)?;

        let record = self.store.create(request).await?;
        tracing::info!(
            "Employment {} created for alumni {} by user {}",
            record.id,
            record.alumni_id,
            caller.user_id
        );
        Ok(record)
    }

    async fn read(
        &self,
        caller: &Identity,
        id: &str,
        view: LifecycleState,
    ) -> ApiResult<EmploymentRecord> {
        let (record, owner_id) = self.store.get(id).await?;
        let status = RecordStatus {
            state: record.lifecycle_state,
            owner_id,
        };
        lifecycle::authorize_read(view, &status, caller)?;
        Ok(record)
    }

    pub async fn get(&self, caller: &Identity, id: &str) -> ApiResult<EmploymentRecord> {
        self.read(caller, id, LifecycleState::Active).await
    }

    pub async fn get_trashed(&self, caller: &Identity, id: &str) -> ApiResult<EmploymentRecord> {
        self.read(caller, id, LifecycleState::SoftDeleted).await
    }

    pub async fn list(
        &self,
        caller: &Identity,
        params: &ListParams,
    ) -> ApiResult<Page<EmploymentRecord>> {
        let filter = EmploymentFilter {
            state: LifecycleState::Active,
            owner_id: policy::owner_filter(caller),
        };
        self.store.list(params, &filter).await
    }

    pub async fn list_trash(
        &self,
        caller: &Identity,
        params: &ListParams,
    ) -> ApiResult<Page<EmploymentRecord>> {
        let filter = EmploymentFilter {
            state: LifecycleState::SoftDeleted,
            owner_id: policy::owner_filter(caller),
        };
        self.store.list(params, &filter).await
    }

    pub async fn list_by_alumni(
        &self,
        caller: &Identity,
        alumni_id: &str,
    ) -> ApiResult<Vec<EmploymentRecord>> {
        let alumni = self.alumni.get(alumni_id).await?;
        policy::ensure_access(caller, &alumni.user_id)?;
        self.store.list_by_alumni(&alumni.id).await
    }

    pub async fn update(
        &self,
        caller: &Identity,
        id: &str,
        changes: &UpdateEmploymentRequest,
    ) -> ApiResult<EmploymentRecord> {
        validate_update(changes)?;
        let record = self.store.update(id, caller, changes).await?;
        tracing::info!("Employment {} updated by user {}", record.id, caller.user_id);
        Ok(record)
    }

    async fn transition(
        &self,
        caller: &Identity,
        id: &str,
        transition: Transition,
    ) -> ApiResult<()> {
        self.store.transition(id, caller, transition).await?;
        tracing::info!(
            "Employment {} {} by user {} (now {})",
            id,
            transition.as_str(),
            caller.user_id,
            transition.target_state()
        );
        Ok(())
    }

    pub async fn soft_delete(&self, caller: &Identity, id: &str) -> ApiResult<()> {
        self.transition(caller, id, Transition::SoftDelete).await
    }

    pub async fn restore(&self, caller: &Identity, id: &str) -> ApiResult<()> {
        self.transition(caller, id, Transition::Restore).await
    }

    pub async fn purge(&self, caller: &Identity, id: &str) -> ApiResult<()> {
        self.transition(caller, id, Transition::Purge).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> CreateEmploymentRequest {
        CreateEmploymentRequest {
            alumni_id: "1".to_string(),
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            industry: String::new(),
            work_location: String::new(),
            salary_range: String::new(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: None,
            employment_status: "Full-time".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_validate_create() {
        assert!(validate_create(&request()).is_ok());

        let mut blank = request();
        blank.company_name = "  ".to_string();
        assert_eq!(
            validate_create(&blank).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let mut backwards = request();
        backwards.end_date = NaiveDate::from_ymd_opt(2022, 12, 31);
        assert_eq!(
            validate_create(&backwards).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_validate_update_rejects_blanking_required_fields() {
        assert!(validate_update(&UpdateEmploymentRequest::default()).is_ok());

        let changes = UpdateEmploymentRequest {
            job_title: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_update(&changes).is_err());
    }
}
