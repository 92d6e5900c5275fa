use crate::database::{fetch_page, now, parse_id, AsyncDbConnection, Filter};
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::query::{ListParams, Page};
use crate::store::AlumniStore;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use shared_types::{
    AlumniEmploymentSummary, AlumniRecord, CreateAlumniRequest, UpdateAlumniRequest,
};

const ALUMNI_COLUMNS: &str = "id, user_id, student_number, name, department, cohort_year, \
    graduation_year, email, phone, address, created_at, updated_at, deleted_at";

pub struct SqliteAlumniStore {
    conn: AsyncDbConnection,
}

impl SqliteAlumniStore {
    pub fn new(conn: AsyncDbConnection) -> Self {
        Self { conn }
    }
}

fn map_alumni(row: &Row<'_>) -> rusqlite::Result<AlumniRecord> {
    Ok(AlumniRecord {
        id: row.get::<_, i64>(0)?.to_string(),
        user_id: row.get::<_, i64>(1)?.to_string(),
        student_number: row.get(2)?,
        name: row.get(3)?,
        department: row.get(4)?,
        cohort_year: row.get(5)?,
        graduation_year: row.get(6)?,
        email: row.get(7)?,
        phone: row.get(8)?,
        address: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        deleted_at: row.get(12)?,
    })
}

fn load_active(conn: &Connection, id: i64) -> ApiResult<AlumniRecord> {
    let sql = format!(
        "SELECT {} FROM alumni WHERE id = ?1 AND deleted_at IS NULL",
        ALUMNI_COLUMNS
    );
    conn.query_row(&sql, [id], map_alumni)
        .optional()?
        .ok_or_else(|| ApiError::not_found("Alumni not found"))
}

fn duplicate_alumni(err: rusqlite::Error) -> ApiError {
    match ApiError::from(err) {
        err if err.kind() == ErrorKind::Conflict => {
            ApiError::conflict("Student number or email already registered")
        }
        err => err,
    }
}

#[async_trait]
impl AlumniStore for SqliteAlumniStore {
    async fn create(&self, request: &CreateAlumniRequest) -> ApiResult<AlumniRecord> {
        let user_id = parse_id(&request.user_id)?;
        let request = request.clone();
        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction()?;

                let user_exists: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM users WHERE id = ?1 AND deleted_at IS NULL",
                        [user_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if user_exists.is_none() {
                    return Err(ApiError::invalid_argument(
                        "user_id does not reference an existing user",
                    ));
                }

                let ts = now();
                let id: i64 = tx
                    .query_row(
                        "INSERT INTO alumni (user_id, student_number, name, department, cohort_year,
                                             graduation_year, email, phone, address, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) RETURNING id",
                        params![
                            user_id,
                            request.student_number,
                            request.name,
                            request.department,
                            request.cohort_year,
                            request.graduation_year,
                            request.email,
                            request.phone,
                            request.address,
                            ts
                        ],
                        |row| row.get(0),
                    )
                    .map_err(duplicate_alumni)?;

                deadline.check()?;
                tx.commit()?;

                Ok(AlumniRecord {
                    id: id.to_string(),
                    user_id: user_id.to_string(),
                    student_number: request.student_number,
                    name: request.name,
                    department: request.department,
                    cohort_year: request.cohort_year,
                    graduation_year: request.graduation_year,
                    email: request.email,
                    phone: request.phone,
                    address: request.address,
                    created_at: ts,
                    updated_at: ts,
                    deleted_at: None,
                })
            })
            .await
    }

    async fn get(&self, id: &str) -> ApiResult<AlumniRecord> {
        let id = parse_id(id)?;
        self.conn.run(move |conn, _| load_active(conn, id)).await
    }

    async fn update(&self, id: &str, changes: &UpdateAlumniRequest) -> ApiResult<AlumniRecord> {
        let id = parse_id(id)?;
        let changes = changes.clone();
        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction()?;
                let mut record = load_active(&tx, id)?;
                changes.apply_to(&mut record);
                record.updated_at = now();

                tx.execute(
                    "UPDATE alumni SET name = ?1, department = ?2, cohort_year = ?3,
                            graduation_year = ?4, email = ?5, phone = ?6, address = ?7,
                            updated_at = ?8
                     WHERE id = ?9 AND deleted_at IS NULL",
                    params![
                        record.name,
                        record.department,
                        record.cohort_year,
                        record.graduation_year,
                        record.email,
                        record.phone,
                        record.address,
                        record.updated_at,
                        id
                    ],
                )
                .map_err(duplicate_alumni)?;

                deadline.check()?;
                tx.commit()?;
                Ok(record)
            })
            .await
    }

    async fn soft_delete(&self, id: &str) -> ApiResult<()> {
        let id = parse_id(id)?;
        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE alumni SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                    params![now(), id],
                )?;
                if changed == 0 {
                    return Err(ApiError::not_found("Alumni not found"));
                }
                deadline.check()?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        owner_id: Option<&str>,
    ) -> ApiResult<Page<AlumniRecord>> {
        let params = params.clone();
        let owner_id = owner_id.map(parse_id).transpose()?;
        self.conn
            .run(move |conn, _| {
                let mut filter = Filter::new();
                filter.push("deleted_at IS NULL", []);
                if let Some(owner_id) = owner_id {
                    filter.push("user_id = ?", [Value::Integer(owner_id)]);
                }
                filter.search(&params, params.search_fields);

                fetch_page(
                    conn,
                    ALUMNI_COLUMNS,
                    "alumni",
                    &filter,
                    params.sort_by,
                    "id",
                    &params,
                    map_alumni,
                )
            })
            .await
    }

    async fn employment_by_graduation_year(
        &self,
        year: i32,
    ) -> ApiResult<Vec<AlumniEmploymentSummary>> {
        self.conn
            .run(move |conn, _| {
                let mut stmt = conn.prepare(
                    "SELECT a.id, a.department, a.graduation_year,
                            e.industry, e.company_name, e.job_title, e.salary_range
                     FROM alumni a
                     JOIN employment e ON e.alumni_id = a.id
                     WHERE a.graduation_year = ?1
                       AND a.deleted_at IS NULL
                       AND e.deleted_at IS NULL
                     ORDER BY a.id ASC, e.start_date ASC, e.id ASC",
                )?;

                let rows = stmt
                    .query_map([year], |row| {
                        Ok(AlumniEmploymentSummary {
                            alumni_id: row.get::<_, i64>(0)?.to_string(),
                            department: row.get(1)?,
                            graduation_year: row.get(2)?,
                            industry: row.get(3)?,
                            company_name: row.get(4)?,
                            job_title: row.get(5)?,
                            salary_range: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(rows)
            })
            .await
    }
}
