//! pipeline::tag
//!
//! Image tag composition.

use chrono::NaiveDate;

use crate::core::key::format_date;

/// Compose `<repository>/<repo-name>:<YYYYMMDD>.<short-commit>`.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use gozer::pipeline::compose_tag;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
/// assert_eq!(
///     compose_tag("registry.local/team/", "web", date, "abc1234"),
///     "registry.local/team/web:20240131.abc1234"
/// );
/// ```
pub fn compose_tag(repository: &str, repo_name: &str, date: NaiveDate, short_commit: &str) -> String {
    format!(
        "{}/{}:{}.{}",
        repository.trim_end_matches('/'),
        repo_name,
        format_date(date),
        short_commit
    )
}
