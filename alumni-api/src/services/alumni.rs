use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::policy;
use crate::query::{ListParams, Page};
use crate::store::AlumniStore;
use shared_types::{AlumniRecord, CreateAlumniRequest, GraduationYearReport, UpdateAlumniRequest};
use std::sync::Arc;

/// Minimum salary an entry must reach to count as well paid
pub const DEFAULT_SALARY_THRESHOLD: i64 = 4_000_000;

/// Lower bound of a free-text range such as `"4.500.000 - 6.000.000"`.
///
/// Takes the text before the first `-` and keeps its digits only, so
/// separators and currency prefixes are ignored. `None` if no digit is found.
pub fn minimum_salary(range: &str) -> Option<i64> {
    let lower = range.split('-').next()?;
    let digits: String = lower.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn validate_years(cohort_year: i32, graduation_year: i32) -> ApiResult<()> {
    if cohort_year <= 0 || graduation_year <= 0 {
        return Err(ApiError::invalid_argument(
            "cohort_year and graduation_year must be positive",
        ));
    }
    if graduation_year < cohort_year {
        return Err(ApiError::invalid_argument(
            "graduation_year cannot be earlier than cohort_year",
        ));
    }
    Ok(())
}

fn validate_create(request: &CreateAlumniRequest) -> ApiResult<()> {
    let required = [
        ("user_id", &request.user_id),
        ("student_number", &request.student_number),
        ("name", &request.name),
        ("department", &request.department),
        ("email", &request.email),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ApiError::invalid_argument(format!("{} is required", field)));
        }
    }
    validate_years(request.cohort_year, request.graduation_year)
}

#[derive(Clone)]
pub struct AlumniService {
    store: Arc<dyn AlumniStore>,
}

impl AlumniService {
    pub fn new(store: Arc<dyn AlumniStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        caller: &Identity,
        request: &CreateAlumniRequest,
    ) -> ApiResult<AlumniRecord> {
        policy::ensure_admin(caller)?;
        validate_create(request)?;

        let record = self.store.create(request).await?;
        tracing::info!("Alumni {} created by {}", record.id, caller.user_id);
        Ok(record)
    }

    pub async fn get(&self, caller: &Identity, id: &str) -> ApiResult<AlumniRecord> {
        let record = self.store.get(id).await?;
        policy::ensure_access(caller, &record.user_id)?;
        Ok(record)
    }

    pub async fn list(
        &self,
        caller: &Identity,
        params: &ListParams,
    ) -> ApiResult<Page<AlumniRecord>> {
        let owner = policy::owner_filter(caller);
        self.store.list(params, owner.as_deref()).await
    }

    pub async fn update(
        &self,
        caller: &Identity,
        id: &str,
        changes: &UpdateAlumniRequest,
    ) -> ApiResult<AlumniRecord> {
        policy::ensure_admin(caller)?;
        let blanked = [&changes.name, &changes.department, &changes.email]
            .into_iter()
            .flatten()
            .any(|value| value.trim().is_empty());
        if blanked {
            return Err(ApiError::invalid_argument(
                "name, department and email cannot be empty",
            ));
        }

        let mut preview = self.store.get(id).await?;
        changes.apply_to(&mut preview);
        validate_years(preview.cohort_year, preview.graduation_year)?;

        let record = self.store.update(id, changes).await?;
        tracing::info!("Alumni {} updated by {}", record.id, caller.user_id);
        Ok(record)
    }

    pub async fn delete(&self, caller: &Identity, id: &str) -> ApiResult<()> {
        policy::ensure_admin(caller)?;
        self.store.soft_delete(id).await?;
        tracing::info!("Alumni {} soft-deleted by {}", id, caller.user_id);
        Ok(())
    }

    pub async fn graduation_year_report(
        &self,
        caller: &Identity,
        year: i32,
        threshold: Option<i64>,
    ) -> ApiResult<GraduationYearReport> {
        policy::ensure_admin(caller)?;
        let threshold = threshold.unwrap_or(DEFAULT_SALARY_THRESHOLD);

        let entries = self.store.employment_by_graduation_year(year).await?;
        let above_threshold = entries
            .iter()
            .filter_map(|entry| minimum_salary(&entry.salary_range))
            .filter(|salary| *salary >= threshold)
            .count();

        Ok(GraduationYearReport {
            graduation_year: year,
            salary_threshold: threshold,
            above_threshold,
            entries,
        })
    }
}
