use crate::auth::Identity;
use crate::document::{new_id, now, paginate, parse_id, Collections, Document, DocumentDb, SortKey};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{self, RecordStatus, Transition};
use crate::query::{ListParams, Page};
use crate::store::{EmploymentFilter, EmploymentStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_types::{
    CreateEmploymentRequest, EmploymentRecord, LifecycleState, UpdateEmploymentRequest,
};
use std::sync::Arc;

/// Stored shape of an employment entry. Soft deletion is a flag plus the
/// actor and time, all three written and cleared together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmploymentDocument {
    pub id: String,
    pub alumni_id: String,
    pub company_name: String,
    pub job_title: String,
    pub industry: String,
    pub work_location: String,
    pub salary_range: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub employment_status: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub is_delete: bool,
    pub delete_by: Option<String>,
    pub deleted_at: Option<i64>,
}

impl EmploymentDocument {
    fn state(&self) -> LifecycleState {
        if self.is_delete {
            LifecycleState::SoftDeleted
        } else {
            LifecycleState::Active
        }
    }

    fn to_record(&self) -> EmploymentRecord {
        EmploymentRecord {
            id: self.id.clone(),
            alumni_id: self.alumni_id.clone(),
            company_name: self.company_name.clone(),
            job_title: self.job_title.clone(),
            industry: self.industry.clone(),
            work_location: self.work_location.clone(),
            salary_range: self.salary_range.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            employment_status: self.employment_status.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            lifecycle_state: self.state(),
            deleted_by: self.delete_by.clone(),
            deleted_at: self.deleted_at,
        }
    }

    fn apply(&mut self, record: &EmploymentRecord) {
        self.company_name = record.company_name.clone();
        self.job_title = record.job_title.clone();
        self.industry = record.industry.clone();
        self.work_location = record.work_location.clone();
        self.salary_range = record.salary_range.clone();
        self.start_date = record.start_date;
        self.end_date = record.end_date;
        self.employment_status = record.employment_status.clone();
        self.description = record.description.clone();
        self.updated_at = record.updated_at;
    }
}

impl Document for EmploymentDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> SortKey<'_> {
        match field {
            "alumni_id" => SortKey::Text(&self.alumni_id),
            "company_name" => SortKey::Text(&self.company_name),
            "job_title" => SortKey::Text(&self.job_title),
            "industry" => SortKey::Text(&self.industry),
            "work_location" => SortKey::Text(&self.work_location),
            "salary_range" => SortKey::Text(&self.salary_range),
            "start_date" => SortKey::Date(self.start_date),
            "end_date" => self.end_date.into(),
            "employment_status" => SortKey::Text(&self.employment_status),
            "created_at" => SortKey::Int(self.created_at),
            "updated_at" => self.updated_at.into(),
            "deleted_at" => self.deleted_at.into(),
            _ => SortKey::Text(&self.id),
        }
    }

    fn search_text(&self, field: &str) -> &str {
        match field {
            "company_name" => &self.company_name,
            "job_title" => &self.job_title,
            "industry" => &self.industry,
            "work_location" => &self.work_location,
            _ => "",
        }
    }
}

/// Owner of an employment entry is the user its alumni belongs to
fn owner_of(c: &Collections, doc: &EmploymentDocument) -> ApiResult<String> {
    c.alumni
        .get(&doc.alumni_id)
        .map(|a| a.user_id.clone())
        .ok_or_else(|| ApiError::internal(format!("Employment {} has no alumni", doc.id)))
}

fn not_found() -> ApiError {
    ApiError::not_found("Employment record not found")
}

pub struct DocumentEmploymentStore {
    db: Arc<DocumentDb>,
}

impl DocumentEmploymentStore {
    pub fn new(db: Arc<DocumentDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmploymentStore for DocumentEmploymentStore {
    async fn create(&self, request: &CreateEmploymentRequest) -> ApiResult<EmploymentRecord> {
        let alumni_id = parse_id(&request.alumni_id)?;
        self.db
            .write(|c| {
                let alumni_active = c
                    .alumni
                    .get(&alumni_id)
                    .map(|a| a.deleted_at.is_none())
                    .unwrap_or(false);
                if !alumni_active {
                    return Err(ApiError::invalid_argument(
                        "alumni_id does not reference an existing alumni",
                    ));
                }

                let doc = EmploymentDocument {
                    id: new_id(),
                    alumni_id,
                    company_name: request.company_name.clone(),
                    job_title: request.job_title.clone(),
                    industry: request.industry.clone(),
                    work_location: request.work_location.clone(),
                    salary_range: request.salary_range.clone(),
                    start_date: request.start_date,
                    end_date: request.end_date,
                    employment_status: request.employment_status.clone(),
                    description: request.description.clone(),
                    created_at: now(),
                    updated_at: None,
                    is_delete: false,
                    delete_by: None,
                    deleted_at: None,
                };
                let record = doc.to_record();
                c.employment.insert(doc.id.clone(), doc);
                Ok(record)
            })
            .await
    }

    async fn get(&self, id: &str) -> ApiResult<(EmploymentRecord, String)> {
        let id = parse_id(id)?;
        self.db
            .read(|c| {
                let doc = c.employment.get(&id).ok_or_else(not_found)?;
                Ok((doc.to_record(), owner_of(c, doc)?))
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        filter: &EmploymentFilter,
    ) -> ApiResult<Page<EmploymentRecord>> {
        self.db
            .read(|c| {
                let docs = c.employment.values().filter(|doc| {
                    doc.state() == filter.state
                        && filter.owner_id.as_deref().map_or(true, |owner| {
                            c.alumni
                                .get(&doc.alumni_id)
                                .map_or(false, |a| a.user_id == owner)
                        })
                });
                Ok(paginate(docs, params, EmploymentDocument::to_record))
            })
            .await
    }

    async fn list_by_alumni(&self, alumni_id: &str) -> ApiResult<Vec<EmploymentRecord>> {
        let alumni_id = parse_id(alumni_id)?;
        self.db
            .read(|c| {
                let mut docs: Vec<_> = c
                    .employment
                    .values()
                    .filter(|doc| doc.alumni_id == alumni_id && !doc.is_delete)
                    .collect();
                docs.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
                Ok(docs.into_iter().map(EmploymentDocument::to_record).collect())
            })
            .await
    }

    async fn update(
        &self,
        id: &str,
        caller: &Identity,
        changes: &UpdateEmploymentRequest,
    ) -> ApiResult<EmploymentRecord> {
        let id = parse_id(id)?;
        self.db
            .write(|c| {
                let doc = c.employment.get(&id).ok_or_else(not_found)?;
                let status = RecordStatus {
                    state: doc.state(),
                    owner_id: owner_of(c, doc)?,
                };
                lifecycle::authorize_update(&status, caller)?;

                let mut record = doc.to_record();
                changes.apply_to(&mut record);
                lifecycle::validate_dates(record.start_date, record.end_date)?;
                record.updated_at = Some(now());

                let doc = c.employment.get_mut(&id).ok_or_else(not_found)?;
                doc.apply(&record);
                Ok(record)
            })
            .await
    }

    async fn transition(
        &self,
        id: &str,
        caller: &Identity,
        transition: Transition,
    ) -> ApiResult<()> {
        let id = parse_id(id)?;
        self.db
            .write(|c| {
                let doc = c.employment.get(&id).ok_or_else(not_found)?;
                let status = RecordStatus {
                    state: doc.state(),
                    owner_id: owner_of(c, doc)?,
                };
                lifecycle::authorize_transition(transition, &status, caller)?;

                match transition {
                    Transition::SoftDelete => {
                        let doc = c.employment.get_mut(&id).ok_or_else(not_found)?;
                        doc.is_delete = true;
                        doc.delete_by = Some(caller.user_id.clone());
                        doc.deleted_at = Some(now());
                    }
                    Transition::Restore => {
                        let doc = c.employment.get_mut(&id).ok_or_else(not_found)?;
                        doc.is_delete = false;
                        doc.delete_by = None;
                        doc.deleted_at = None;
                    }
                    Transition::Purge => {
                        c.employment.remove(&id);
                    }
                }

                tracing::debug!(
                    "employment {} moved to {} by user {}",
                    id,
                    transition.target_state(),
                    caller.user_id
                );
                Ok(())
            })
            .await
    }
}
