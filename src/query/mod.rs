//! Uniform filter → sort → paginate pipeline, shared by every entity list.
//!
//! The filter spec is a closed, enumerated structure (field → predicate →
//! value) rather than an open bag of keys, so the engine is implemented
//! once, generically, over anything that can expose its fields as
//! [`FieldValue`]s.

use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::transport::envelope::Paginated;

/// A field as seen by the query engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Str(&'a str),
    F64(f64),
    Time(DateTime<Utc>),
    Bool(bool),
}

/// Exposes an entity's filterable/sortable fields by name.
///
/// Returning `None` means the entity does not carry that field; such a
/// record never matches a clause naming it.
pub trait Queryable {
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

/// The enumerated predicate kinds a filter clause can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact string match. An empty value matches everything, mirroring an
    /// empty dropdown in the filter bar.
    Equals(String),
    /// Two-sided inclusive range over a time field. A `None` bound is
    /// unbounded on that side.
    DateRange {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    /// Inclusive numeric lower bound (`min_`-prefixed filter fields).
    Min(f64),
    /// Inclusive numeric upper bound (`max_`-prefixed filter fields).
    Max(f64),
}

/// Declarative description of which records a query should include.
/// Clauses are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    clauses: Vec<(String, Predicate)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, Predicate)] {
        &self.clauses
    }

    /// Add an exact-match clause.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((field.into(), Predicate::Equals(value.into())));
        self
    }

    /// Add an inclusive date-range clause.
    pub fn date_range(
        mut self,
        field: impl Into<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.clauses
            .push((field.into(), Predicate::DateRange { start, end }));
        self
    }

    /// Add an inclusive numeric lower bound.
    pub fn min(mut self, field: impl Into<String>, value: f64) -> Self {
        self.clauses.push((field.into(), Predicate::Min(value)));
        self
    }

    /// Add an inclusive numeric upper bound.
    pub fn max(mut self, field: impl Into<String>, value: f64) -> Self {
        self.clauses.push((field.into(), Predicate::Max(value)));
        self
    }

    /// Reject contradictory numeric bounds (`min_x > max_x`) before any
    /// record is examined.
    fn validate(&self) -> Result<(), ApiError> {
        for (field, predicate) in &self.clauses {
            if let Predicate::Min(min) = predicate {
                for (other_field, other) in &self.clauses {
                    if other_field == field {
                        if let Predicate::Max(max) = other {
                            if min > max {
                                return Err(ApiError::Validation(format!(
                                    "min bound {min} exceeds max bound {max} for field '{field}'"
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a record satisfies every clause.
    fn matches<T: Queryable>(&self, record: &T) -> bool {
        self.clauses.iter().all(|(field, predicate)| {
            match predicate {
                // Empty equals value matches everything, like an unset
                // filter-bar dropdown.
                Predicate::Equals(value) if value.is_empty() => true,
                predicate => match record.field(field) {
                    Some(actual) => predicate_matches(predicate, actual),
                    None => false,
                },
            }
        })
    }

    /// Render the spec as REST query parameters: `field=value` for exact
    /// matches, `min_field`/`max_field` for bounds, `start_date`/`end_date`
    /// for the endpoint's canonical time field.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.clauses.len());
        for (field, predicate) in &self.clauses {
            match predicate {
                Predicate::Equals(value) => {
                    if !value.is_empty() {
                        params.push((field.clone(), value.clone()));
                    }
                }
                Predicate::DateRange { start, end } => {
                    if let Some(start) = start {
                        params.push(("start_date".to_string(), start.to_rfc3339()));
                    }
                    if let Some(end) = end {
                        params.push(("end_date".to_string(), end.to_rfc3339()));
                    }
                }
                Predicate::Min(value) => {
                    params.push((format!("min_{field}"), value.to_string()));
                }
                Predicate::Max(value) => {
                    params.push((format!("max_{field}"), value.to_string()));
                }
            }
        }
        params
    }
}

fn predicate_matches(predicate: &Predicate, actual: FieldValue<'_>) -> bool {
    match (predicate, actual) {
        (Predicate::Equals(expected), FieldValue::Str(s)) => s == expected,
        (Predicate::Equals(expected), FieldValue::Bool(b)) => expected == if b { "true" } else { "false" },
        (Predicate::DateRange { start, end }, FieldValue::Time(t)) => {
            start.map_or(true, |s| t >= s) && end.map_or(true, |e| t <= e)
        }
        (Predicate::Min(min), FieldValue::F64(v)) => v >= *min,
        (Predicate::Max(max), FieldValue::F64(v)) => v <= *max,
        // Type mismatch between clause and field: no match.
        _ => false,
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Single-field sort. Ties keep insertion order (stable sort), which keeps
/// pagination deterministic across repeated calls.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    fn validate(self) -> Result<(), ApiError> {
        if self.page_size == 0 {
            return Err(ApiError::Validation("page size must be >= 1".into()));
        }
        if self.page == 0 {
            return Err(ApiError::Validation("page numbers are 1-indexed".into()));
        }
        Ok(())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: crate::config::defaults::DEFAULT_PAGE_SIZE,
        }
    }
}

fn compare_values(a: FieldValue<'_>, b: FieldValue<'_>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (FieldValue::Str(x), FieldValue::Str(y)) => x.cmp(y),
        (FieldValue::F64(x), FieldValue::F64(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (FieldValue::Time(x), FieldValue::Time(y)) => x.cmp(&y),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(&y),
        // Mixed types compare equal, leaving insertion order in charge.
        _ => Ordering::Equal,
    }
}

/// Run the filter → sort → paginate pipeline over a collection snapshot.
///
/// `total` counts records after filtering, before paging. A page past the
/// end yields empty items with the correct total; it is never an error.
pub fn query<T: Queryable + Clone>(
    collection: &[T],
    filter: &FilterSpec,
    sort: Option<&SortSpec>,
    page: PageRequest,
) -> Result<Paginated<T>, ApiError> {
    page.validate()?;
    filter.validate()?;

    let mut filtered: Vec<T> = collection
        .iter()
        .filter(|record| filter.matches(*record))
        .cloned()
        .collect();

    if let Some(sort) = sort {
        // Vec::sort_by is stable: ties keep collection order.
        filtered.sort_by(|a, b| {
            let ordering = match (a.field(&sort.field), b.field(&sort.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            match sort.dir {
                SortDir::Asc => ordering,
                SortDir::Desc => ordering.reverse(),
            }
        });
    }

    let total = filtered.len() as u64;
    let start = (page.page - 1).saturating_mul(page.page_size);
    let items: Vec<T> = filtered
        .into_iter()
        .skip(start)
        .take(page.page_size)
        .collect();

    Ok(Paginated {
        data: items,
        total,
        page: page.page as u64,
        limit: page.page_size as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Minimal queryable record for engine tests.
    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: String,
        severity: String,
        score: f64,
        at: DateTime<Utc>,
    }

    impl Queryable for Row {
        fn field(&self, name: &str) -> Option<FieldValue<'_>> {
            match name {
                "name" => Some(FieldValue::Str(&self.name)),
                "severity" => Some(FieldValue::Str(&self.severity)),
                "score" => Some(FieldValue::F64(self.score)),
                "at" => Some(FieldValue::Time(self.at)),
                _ => None,
            }
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        let base = Utc::now();
        (0..n)
            .map(|i| Row {
                name: format!("row-{i:03}"),
                severity: if i % 3 == 0 { "Critical" } else { "Info" }.to_string(),
                score: (i % 5) as f64,
                at: base + chrono::Duration::minutes(i as i64),
            })
            .collect()
    }

    #[test]
    fn empty_collection_yields_empty_page_any_page() {
        let empty: Vec<Row> = Vec::new();
        for page in [1, 2, 50] {
            let result = query(&empty, &FilterSpec::new(), None, PageRequest::new(page, 10))
                .unwrap();
            assert!(result.data.is_empty());
            assert_eq!(result.total, 0);
        }
    }

    #[test]
    fn zero_page_size_is_a_validation_error() {
        let err = query(&rows(3), &FilterSpec::new(), None, PageRequest::new(1, 0)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn zero_page_is_a_validation_error() {
        let err = query(&rows(3), &FilterSpec::new(), None, PageRequest::new(0, 10)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn contradictory_bounds_are_a_validation_error() {
        let filter = FilterSpec::new().min("score", 3.0).max("score", 1.0);
        let err = query(&rows(5), &filter, None, PageRequest::default()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn bounds_on_different_fields_do_not_conflict() {
        let filter = FilterSpec::new().min("score", 3.0).max("other", 1.0);
        assert!(query(&rows(5), &filter, None, PageRequest::default()).is_ok());
    }

    #[test]
    fn equals_filter_is_exact_and_total_counts_before_paging() {
        let data = rows(30);
        let expected = data.iter().filter(|r| r.severity == "Critical").count();

        let filter = FilterSpec::new().equals("severity", "Critical");
        let result = query(&data, &filter, None, PageRequest::new(1, 5)).unwrap();

        assert_eq!(result.total as usize, expected);
        assert!(result.data.iter().all(|r| r.severity == "Critical"));
        assert_eq!(result.data.len(), 5.min(expected));
    }

    #[test]
    fn empty_equals_value_matches_everything() {
        let data = rows(7);
        let filter = FilterSpec::new().equals("severity", "");
        let result = query(&data, &filter, None, PageRequest::new(1, 100)).unwrap();
        assert_eq!(result.total, 7);
    }

    #[test]
    fn unknown_field_matches_nothing() {
        let data = rows(7);
        let filter = FilterSpec::new().equals("nonexistent", "x");
        let result = query(&data, &filter, None, PageRequest::default()).unwrap();
        assert_eq!(result.total, 0);
    }

    #[test]
    fn date_range_bounds_are_inclusive_and_null_is_unbounded() {
        let data = rows(10);
        let start = data[3].at;
        let end = data[6].at;

        let both = FilterSpec::new().date_range("at", Some(start), Some(end));
        let result = query(&data, &both, None, PageRequest::new(1, 100)).unwrap();
        assert_eq!(result.total, 4); // rows 3..=6

        let open_end = FilterSpec::new().date_range("at", Some(start), None);
        let result = query(&data, &open_end, None, PageRequest::new(1, 100)).unwrap();
        assert_eq!(result.total, 7); // rows 3..=9
    }

    #[test]
    fn filter_is_idempotent_on_an_unmodified_collection() {
        let data = rows(40);
        let filter = FilterSpec::new().equals("severity", "Info").min("score", 2.0);
        let first = query(&data, &filter, None, PageRequest::new(2, 7)).unwrap();
        let second = query(&data, &filter, None, PageRequest::new(2, 7)).unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.total, second.total);
    }

    #[test]
    fn pagination_boundary_scenario() {
        // 23 matching records, page size 10: 10 / 10 / 3 / 0.
        let mut data = rows(23);
        for row in &mut data {
            row.severity = "Critical".to_string();
        }
        let filter = FilterSpec::new().equals("severity", "Critical");

        let sizes: Vec<usize> = [1, 2, 3, 4]
            .iter()
            .map(|&p| {
                let result = query(&data, &filter, None, PageRequest::new(p, 10)).unwrap();
                assert_eq!(result.total, 23);
                result.data.len()
            })
            .collect();
        assert_eq!(sizes, vec![10, 10, 3, 0]);
    }

    #[test]
    fn sort_desc_reverses_and_ties_keep_insertion_order() {
        let data = rows(10); // scores cycle 0..5, so plenty of ties
        let sorted = query(
            &data,
            &FilterSpec::new(),
            Some(&SortSpec::asc("score")),
            PageRequest::new(1, 100),
        )
        .unwrap();

        // Within equal scores, earlier rows must still precede later ones.
        for window in sorted.data.windows(2) {
            if window[0].score == window[1].score {
                assert!(window[0].name < window[1].name);
            } else {
                assert!(window[0].score < window[1].score);
            }
        }
    }

    proptest! {
        #[test]
        fn page_length_formula_holds(
            count in 0usize..120,
            page in 1usize..20,
            page_size in 1usize..25,
        ) {
            let data = rows(count);
            let result = query(&data, &FilterSpec::new(), None, PageRequest::new(page, page_size))
                .unwrap();
            let total = result.total as usize;
            let expected = page_size.min(total.saturating_sub((page - 1) * page_size));
            prop_assert_eq!(result.data.len(), expected);
            prop_assert_eq!(total, count);
        }

        #[test]
        fn stable_sort_keeps_tied_rows_in_collection_order(
            count in 0usize..60,
            page in 1usize..8,
            page_size in 1usize..15,
        ) {
            let data = rows(count);
            let full = query(
                &data,
                &FilterSpec::new(),
                Some(&SortSpec::asc("score")),
                PageRequest::new(1, count.max(1)),
            ).unwrap();
            let paged = query(
                &data,
                &FilterSpec::new(),
                Some(&SortSpec::asc("score")),
                PageRequest::new(page, page_size),
            ).unwrap();

            // Any page must be the matching slice of the full ordering.
            let start = ((page - 1) * page_size).min(full.data.len());
            let end = (start + page_size).min(full.data.len());
            prop_assert_eq!(&paged.data[..], &full.data[start..end]);
        }
    }
}
