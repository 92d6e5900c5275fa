//! Normalization of list parameters.
//!
//! Raw query strings are never trusted: unknown sort fields fall back to the
//! resource default, unknown orders fall back to ascending, and page/limit
//! are clamped. The resolved sort column is always one of the static names
//! in the resource's [`SortSpec`], so it is safe to splice into SQL.

use serde::Deserialize;
use shared_types::{ApiResponse, ListMeta};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Query string as received
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

/// Per-resource sort whitelist and search fields
#[derive(Debug)]
pub struct SortSpec {
    pub fields: &'static [&'static str],
    pub default_field: &'static str,
    pub search_fields: &'static [&'static str],
}

pub const USER_SORT: SortSpec = SortSpec {
    fields: &["id", "username", "email", "role", "created_at"],
    default_field: "id",
    search_fields: &["username", "email"],
};

pub const ALUMNI_SORT: SortSpec = SortSpec {
    fields: &[
        "id",
        "user_id",
        "student_number",
        "name",
        "department",
        "cohort_year",
        "graduation_year",
        "email",
        "created_at",
        "updated_at",
    ],
    default_field: "id",
    search_fields: &["student_number", "name", "email"],
};

pub const EMPLOYMENT_SORT: SortSpec = SortSpec {
    fields: &[
        "id",
        "alumni_id",
        "company_name",
        "job_title",
        "industry",
        "work_location",
        "salary_range",
        "start_date",
        "end_date",
        "employment_status",
        "created_at",
        "updated_at",
        "deleted_at",
    ],
    default_field: "id",
    search_fields: &["company_name", "job_title", "industry", "work_location"],
};

pub const FILE_SORT: SortSpec = SortSpec {
    fields: &["id", "original_name", "size", "content_type", "uploaded_at"],
    default_field: "uploaded_at",
    search_fields: &["original_name", "content_type"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|o| o.trim().to_ascii_lowercase()) {
            Some(o) if o == "desc" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Validated list parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub sort_by: &'static str,
    pub order: SortOrder,
    pub search: String,
    pub search_fields: &'static [&'static str],
}

impl ListParams {
    pub fn resolve(query: &ListQuery, spec: &SortSpec) -> Self {
        let page = parse_positive(query.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(query.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);

        let sort_by = query
            .sort_by
            .as_deref()
            .map(str::trim)
            .and_then(|requested| spec.fields.iter().find(|field| **field == requested))
            .copied()
            .unwrap_or(spec.default_field);

        Self {
            page,
            limit,
            sort_by,
            order: SortOrder::parse(query.order.as_deref()),
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            search_fields: spec.search_fields,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn has_search(&self) -> bool {
        !self.search.is_empty()
    }

    /// Case-insensitive substring match used by the in-process backend
    pub fn matches<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> bool {
        if !self.has_search() {
            return true;
        }
        let needle = fold_case(&self.search);
        values
            .into_iter()
            .any(|value| fold_case(value).contains(&needle))
    }

    /// Case-folded LIKE pattern with `%`, `_` and `\` escaped (use with
    /// `ESCAPE '\'` against a column wrapped in `unicode_lower`)
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.search.len() + 2);
        pattern.push('%');
        for c in fold_case(&self.search).chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    pub fn meta(&self, total: u64) -> ListMeta {
        ListMeta {
            page: self.page,
            limit: self.limit,
            total,
            pages: page_count(total, self.limit),
            sort_by: self.sort_by.to_string(),
            order: self.order.as_str().to_string(),
            search: self.search.clone(),
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
}

/// Case folding shared by the in-process matcher and the SQL `unicode_lower`
/// function, so both backends agree on non-ASCII searches
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

pub fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

/// One page of results plus the unpaged count under the same filter
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn into_response(self, params: &ListParams) -> ApiResponse<Vec<T>> {
        let meta = params.meta(self.total);
        ApiResponse::ok(self.items).with_meta(meta)
    }
}
