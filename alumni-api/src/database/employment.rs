use crate::auth::Identity;
use crate::database::{fetch_page, now, parse_id, AsyncDbConnection, Filter};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{self, RecordStatus, Transition};
use crate::query::{ListParams, Page};
use crate::store::{EmploymentFilter, EmploymentStore};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use shared_types::{
    CreateEmploymentRequest, EmploymentRecord, LifecycleState, UpdateEmploymentRequest,
};

const EMPLOYMENT_COLUMNS: &str = "e.id, e.alumni_id, e.company_name, e.job_title, e.industry, \
    e.work_location, e.salary_range, e.start_date, e.end_date, e.employment_status, \
    e.description, e.created_at, e.updated_at, e.deleted_by, e.deleted_at, a.user_id";

const EMPLOYMENT_FROM: &str = "employment e JOIN alumni a ON a.id = e.alumni_id";

pub struct SqliteEmploymentStore {
    conn: AsyncDbConnection,
}

impl SqliteEmploymentStore {
    pub fn new(conn: AsyncDbConnection) -> Self {
        Self { conn }
    }
}

/// Maps one row to the record and the owning user id
fn map_employment(row: &Row<'_>) -> rusqlite::Result<(EmploymentRecord, String)> {
    let deleted_at: Option<i64> = row.get(14)?;
    let record = EmploymentRecord {
        id: row.get::<_, i64>(0)?.to_string(),
        alumni_id: row.get::<_, i64>(1)?.to_string(),
        company_name: row.get(2)?,
        job_title: row.get(3)?,
        industry: row.get(4)?,
        work_location: row.get(5)?,
        salary_range: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        employment_status: row.get(9)?,
        description: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        lifecycle_state: if deleted_at.is_some() {
            LifecycleState::SoftDeleted
        } else {
            LifecycleState::Active
        },
        deleted_by: row.get::<_, Option<i64>>(13)?.map(|id| id.to_string()),
        deleted_at,
    };
    let owner_id = row.get::<_, i64>(15)?.to_string();
    Ok((record, owner_id))
}

fn load(conn: &Connection, id: i64) -> ApiResult<Option<(EmploymentRecord, String)>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE e.id = ?1",
        EMPLOYMENT_COLUMNS, EMPLOYMENT_FROM
    );
    Ok(conn.query_row(&sql, [id], map_employment).optional()?)
}

fn status_of(record: &EmploymentRecord, owner_id: String) -> RecordStatus {
    RecordStatus {
        state: record.lifecycle_state,
        owner_id,
    }
}

fn not_found() -> ApiError {
    ApiError::not_found("Employment record not found")
}

#[async_trait]
impl EmploymentStore for SqliteEmploymentStore {
    async fn create(&self, request: &CreateEmploymentRequest) -> ApiResult<EmploymentRecord> {
        let alumni_id = parse_id(&request.alumni_id)?;
        let request = request.clone();
        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let alumni: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM alumni WHERE id = ?1 AND deleted_at IS NULL",
                        [alumni_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if alumni.is_none() {
                    return Err(ApiError::invalid_argument(
                        "alumni_id does not reference an existing alumni",
                    ));
                }

                let created_at = now();
                let id: i64 = tx.query_row(
                    "INSERT INTO employment (alumni_id, company_name, job_title, industry,
                                             work_location, salary_range, start_date, end_date,
                                             employment_status, description, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) RETURNING id",
                    params![
                        alumni_id,
                        request.company_name,
                        request.job_title,
                        request.industry,
                        request.work_location,
                        request.salary_range,
                        request.start_date,
                        request.end_date,
                        request.employment_status,
                        request.description,
                        created_at
                    ],
                    |row| row.get(0),
                )?;

                deadline.check()?;
                tx.commit()?;

                Ok(EmploymentRecord {
                    id: id.to_string(),
                    alumni_id: alumni_id.to_string(),
                    company_name: request.company_name,
                    job_title: request.job_title,
                    industry: request.industry,
                    work_location: request.work_location,
                    salary_range: request.salary_range,
                    start_date: request.start_date,
                    end_date: request.end_date,
                    employment_status: request.employment_status,
                    description: request.description,
                    created_at,
                    updated_at: None,
                    lifecycle_state: LifecycleState::Active,
                    deleted_by: None,
                    deleted_at: None,
                })
            })
            .await
    }

    async fn get(&self, id: &str) -> ApiResult<(EmploymentRecord, String)> {
        let id = parse_id(id)?;
        self.conn
            .run(move |conn, _| load(conn, id)?.ok_or_else(not_found))
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        filter: &EmploymentFilter,
    ) -> ApiResult<Page<EmploymentRecord>> {
        let params = params.clone();
        let state = filter.state;
        let owner_id = filter.owner_id.as_deref().map(parse_id).transpose()?;

        self.conn
            .run(move |conn, _| {
                let mut filter = Filter::new();
                match state {
                    LifecycleState::Active => filter.push("e.deleted_at IS NULL", []),
                    LifecycleState::SoftDeleted => filter.push("e.deleted_at IS NOT NULL", []),
                    LifecycleState::Purged => {
                        return Ok(Page {
                            items: Vec::new(),
                            total: 0,
                        })
                    }
                }
                if let Some(owner_id) = owner_id {
                    filter.push("a.user_id = ?", [Value::Integer(owner_id)]);
                }
                let search_columns: Vec<String> = params
                    .search_fields
                    .iter()
                    .map(|field| format!("e.{}", field))
                    .collect();
                let search_columns: Vec<&str> =
                    search_columns.iter().map(String::as_str).collect();
                filter.search(&params, &search_columns);

                let sort_column = format!("e.{}", params.sort_by);
                let page = fetch_page(
                    conn,
                    EMPLOYMENT_COLUMNS,
                    EMPLOYMENT_FROM,
                    &filter,
                    &sort_column,
                    "e.id",
                    &params,
                    map_employment,
                )?;

                Ok(Page {
                    items: page.items.into_iter().map(|(record, _)| record).collect(),
                    total: page.total,
                })
            })
            .await
    }

    async fn list_by_alumni(&self, alumni_id: &str) -> ApiResult<Vec<EmploymentRecord>> {
        let alumni_id = parse_id(alumni_id)?;
        self.conn
            .run(move |conn, _| {
                let sql = format!(
                    "SELECT {} FROM {}
                     WHERE e.alumni_id = ?1 AND e.deleted_at IS NULL
                     ORDER BY e.start_date ASC, e.id ASC",
                    EMPLOYMENT_COLUMNS, EMPLOYMENT_FROM
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map([alumni_id], map_employment)?
                    .map(|row| row.map(|(record, _)| record))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
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
        let caller = caller.clone();
        let changes = changes.clone();

        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let (mut record, owner_id) = load(&tx, id)?.ok_or_else(not_found)?;
                lifecycle::authorize_update(&status_of(&record, owner_id), &caller)?;

                changes.apply_to(&mut record);
                lifecycle::validate_dates(record.start_date, record.end_date)?;
                record.updated_at = Some(now());

                let changed = tx.execute(
                    "UPDATE employment SET company_name = ?1, job_title = ?2, industry = ?3,
                            work_location = ?4, salary_range = ?5, start_date = ?6,
                            end_date = ?7, employment_status = ?8, description = ?9,
                            updated_at = ?10
                     WHERE id = ?11 AND deleted_at IS NULL",
                    params![
                        record.company_name,
                        record.job_title,
                        record.industry,
                        record.work_location,
                        record.salary_range,
                        record.start_date,
                        record.end_date,
                        record.employment_status,
                        record.description,
                        record.updated_at,
                        id
                    ],
                )?;
                if changed == 0 {
                    return Err(not_found());
                }

                deadline.check()?;
                tx.commit()?;
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
        let caller_id = parse_id(&caller.user_id)?;
        let caller = caller.clone();

        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let status = tx
                    .query_row(
                        "SELECT a.user_id, e.deleted_at
                         FROM employment e JOIN alumni a ON a.id = e.alumni_id
                         WHERE e.id = ?1",
                        [id],
                        |row| {
                            let deleted_at: Option<i64> = row.get(1)?;
                            Ok(RecordStatus {
                                owner_id: row.get::<_, i64>(0)?.to_string(),
                                state: if deleted_at.is_some() {
                                    LifecycleState::SoftDeleted
                                } else {
                                    LifecycleState::Active
                                },
                            })
                        },
                    )
                    .optional()?
                    .ok_or_else(not_found)?;

                lifecycle::authorize_transition(transition, &status, &caller)?;

                let changed = match transition {
                    Transition::SoftDelete => tx.execute(
                        "UPDATE employment SET deleted_by = ?1, deleted_at = ?2
                         WHERE id = ?3 AND deleted_at IS NULL",
                        params![caller_id, now(), id],
                    )?,
                    Transition::Restore => tx.execute(
                        "UPDATE employment SET deleted_by = NULL, deleted_at = NULL
                         WHERE id = ?1 AND deleted_at IS NOT NULL",
                        [id],
                    )?,
                    Transition::Purge => tx.execute(
                        "DELETE FROM employment WHERE id = ?1 AND deleted_at IS NOT NULL",
                        [id],
                    )?,
                };
                if changed == 0 {
                    return Err(not_found());
                }

                deadline.check()?;
                tx.commit()?;

                tracing::debug!(
                    "employment {} moved to {} by user {}",
                    id,
                    transition.target_state(),
                    caller_id
                );
                Ok(())
            })
            .await
    }
}
