// crates/db/src/scan.rs
//! Paginated full-table scans.
//!
//! The backend caps rows per response, so aggregates that need every row
//! walk the table in fixed pages until one comes back empty. Each scan has a
//! page ceiling; when the ceiling stops a scan the result covers at most the
//! first `max_pages * PAGE_SIZE` rows and the outcome is flagged `truncated`.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::query::Query;
use crate::source::DataSource;
use crate::DbResult;

pub const PAGE_SIZE: usize = 1000;

/// Users-table aggregates.
pub const USERS_SCAN_MAX_PAGES: usize = 11;
/// Chat-history aggregates over timestamps.
pub const MESSAGES_SCAN_MAX_PAGES: usize = 51;
/// Per-session message counting.
pub const SESSION_SCAN_MAX_PAGES: usize = 101;
/// CSV exports.
pub const EXPORT_MAX_PAGES: usize = 11;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub pages: usize,
    pub rows: usize,
    pub truncated: bool,
}

/// Fetch `base` page by page and hand every decoded row to `visit`.
///
/// Stops on an empty page or after `max_pages` pages. A short page does not
/// end the scan: the next request starts after the last row received, so a
/// backend that caps responses below `PAGE_SIZE` is still walked in full.
/// A failing page aborts the scan.
pub async fn scan_pages<T, F>(
    source: &dyn DataSource,
    base: &Query,
    max_pages: usize,
    mut visit: F,
) -> DbResult<ScanOutcome>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    let mut outcome = ScanOutcome::default();
    let mut short_page = false;
    let mut warned_cap = false;

    loop {
        if outcome.pages >= max_pages {
            outcome.truncated = true;
            break;
        }
        let from = outcome.rows;
        let page = source
            .execute(&base.clone().range(from, from + PAGE_SIZE - 1))
            .await?;
        outcome.pages += 1;

        let rows: Vec<T> = page.decode()?;
        let fetched = rows.len();
        if fetched == 0 {
            break;
        }
        if short_page && !warned_cap {
            warned_cap = true;
            warn!(
                table = base.table.name(),
                offset = from,
                page_size = PAGE_SIZE,
                "backend returned a short page before the end of the table; row cap is below the scan page size"
            );
        }
        short_page = fetched < PAGE_SIZE;
        outcome.rows += fetched;
        rows.into_iter().for_each(&mut visit);
    }

    let table = base.table.name();
    metrics::counter!("crysta_scan_pages_total", "table" => table).increment(outcome.pages as u64);
    metrics::counter!("crysta_scan_rows_total", "table" => table).increment(outcome.rows as u64);
    if outcome.truncated {
        metrics::counter!("crysta_scan_truncated_total", "table" => table).increment(1);
        warn!(
            table,
            pages = outcome.pages,
            rows = outcome.rows,
            "scan stopped at page ceiling; aggregate covers a prefix of the table"
        );
    }

    Ok(outcome)
}
