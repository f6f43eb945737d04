use serde::Serialize;

/// Page-number pagination envelope: total count, relative links to the
/// neighboring pages and the current page of results.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(count: i64, page: i64, limit: i64, results: Vec<T>) -> Self {
        let next = (page * limit < count).then(|| format!("?page={}&limit={}", page + 1, limit));
        let previous = (page > 1).then(|| format!("?page={}&limit={}", page - 1, limit));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Clamps the page/limit query parameters: page >= 1, 1 <= limit <= 100,
/// with the default page size coming from configuration.
pub fn page_bounds(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, 100);
    (page, limit)
}
