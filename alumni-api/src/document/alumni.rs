use crate::document::{new_id, now, paginate, parse_id, Collections, Document, DocumentDb, SortKey};
use crate::error::{ApiError, ApiResult};
use crate::query::{ListParams, Page};
use crate::store::AlumniStore;
use async_trait::async_trait;
use shared_types::{
    AlumniEmploymentSummary, AlumniRecord, CreateAlumniRequest, UpdateAlumniRequest,
};
use std::sync::Arc;

impl Document for AlumniRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> SortKey<'_> {
        match field {
            "user_id" => SortKey::Text(&self.user_id),
            "student_number" => SortKey::Text(&self.student_number),
            "name" => SortKey::Text(&self.name),
            "department" => SortKey::Text(&self.department),
            "cohort_year" => SortKey::Int(i64::from(self.cohort_year)),
            "graduation_year" => SortKey::Int(i64::from(self.graduation_year)),
            "email" => SortKey::Text(&self.email),
            "created_at" => SortKey::Int(self.created_at),
            "updated_at" => SortKey::Int(self.updated_at),
            _ => SortKey::Text(&self.id),
        }
    }

    fn search_text(&self, field: &str) -> &str {
        match field {
            "student_number" => &self.student_number,
            "name" => &self.name,
            "email" => &self.email,
            _ => "",
        }
    }
}

/// Student number and email are unique across every alumni, deleted or not
fn ensure_unique(
    c: &Collections,
    skip_id: Option<&str>,
    student_number: &str,
    email: &str,
) -> ApiResult<()> {
    let taken = c
        .alumni
        .values()
        .filter(|a| Some(a.id.as_str()) != skip_id)
        .any(|a| a.student_number == student_number || a.email == email);
    if taken {
        Err(ApiError::conflict(
            "Student number or email already registered",
        ))
    } else {
        Ok(())
    }
}

pub struct DocumentAlumniStore {
    db: Arc<DocumentDb>,
}

impl DocumentAlumniStore {
    pub fn new(db: Arc<DocumentDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AlumniStore for DocumentAlumniStore {
    async fn create(&self, request: &CreateAlumniRequest) -> ApiResult<AlumniRecord> {
        let user_id = parse_id(&request.user_id)?;
        self.db
            .write(|c| {
                let user_active = c
                    .users
                    .get(&user_id)
                    .map(|u| u.deleted_at.is_none())
                    .unwrap_or(false);
                if !user_active {
                    return Err(ApiError::invalid_argument(
                        "user_id does not reference an existing user",
                    ));
                }
                ensure_unique(c, None, &request.student_number, &request.email)?;

                let ts = now();
                let record = AlumniRecord {
                    id: new_id(),
                    user_id,
                    student_number: request.student_number.clone(),
                    name: request.name.clone(),
                    department: request.department.clone(),
                    cohort_year: request.cohort_year,
                    graduation_year: request.graduation_year,
                    email: request.email.clone(),
                    phone: request.phone.clone(),
                    address: request.address.clone(),
                    created_at: ts,
                    updated_at: ts,
                    deleted_at: None,
                };
                c.alumni.insert(record.id.clone(), record.clone());
                Ok(record)
            })
            .await
    }

    async fn get(&self, id: &str) -> ApiResult<AlumniRecord> {
        let id = parse_id(id)?;
        self.db
            .read(|c| {
                c.alumni
                    .get(&id)
                    .filter(|a| a.deleted_at.is_none())
                    .cloned()
                    .ok_or_else(|| ApiError::not_found("Alumni not found"))
            })
            .await
    }

    async fn update(&self, id: &str, changes: &UpdateAlumniRequest) -> ApiResult<AlumniRecord> {
        let id = parse_id(id)?;
        self.db
            .write(|c| {
                let mut record = c
                    .alumni
                    .get(&id)
                    .filter(|a| a.deleted_at.is_none())
                    .cloned()
                    .ok_or_else(|| ApiError::not_found("Alumni not found"))?;

                changes.apply_to(&mut record);
                ensure_unique(c, Some(&id), &record.student_number, &record.email)?;
                record.updated_at = now();

                c.alumni.insert(id.clone(), record.clone());
                Ok(record)
            })
            .await
    }

    async fn soft_delete(&self, id: &str) -> ApiResult<()> {
        let id = parse_id(id)?;
        self.db
            .write(|c| {
                let record = c
                    .alumni
                    .get_mut(&id)
                    .filter(|a| a.deleted_at.is_none())
                    .ok_or_else(|| ApiError::not_found("Alumni not found"))?;
                record.deleted_at = Some(now());
                Ok(())
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        owner_id: Option<&str>,
    ) -> ApiResult<Page<AlumniRecord>> {
        self.db
            .read(|c| {
                let docs = c.alumni.values().filter(|a| {
                    a.deleted_at.is_none() && owner_id.map_or(true, |owner| a.user_id == owner)
                });
                Ok(paginate(docs, params, AlumniRecord::clone))
            })
            .await
    }

    async fn employment_by_graduation_year(
        &self,
        year: i32,
    ) -> ApiResult<Vec<AlumniEmploymentSummary>> {
        self.db
            .read(|c| {
                let mut rows = Vec::new();
                for alumni in c
                    .alumni
                    .values()
                    .filter(|a| a.graduation_year == year && a.deleted_at.is_none())
                {
                    let mut jobs: Vec<_> = c
                        .employment
                        .values()
                        .filter(|e| e.alumni_id == alumni.id && !e.is_delete)
                        .collect();
                    jobs.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));

                    rows.extend(jobs.into_iter().map(|job| AlumniEmploymentSummary {
                        alumni_id: alumni.id.clone(),
                        department: alumni.department.clone(),
                        graduation_year: alumni.graduation_year,
                        industry: job.industry.clone(),
                        company_name: job.company_name.clone(),
                        job_title: job.job_title.clone(),
                        salary_range: job.salary_range.clone(),
                    }));
                }
                Ok(rows)
            })
            .await
    }
}
