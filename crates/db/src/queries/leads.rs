// crates/db/src/queries/leads.rs
// Paginated leads table, lead export, and single-lead lookup.

use crysta_view_core::transform::transform_lead;
use crysta_view_core::{has_more, page_bounds, DisplayLead, Lead, LeadsPage};

use super::types::{trimmed, LeadFilter, LEAD_SEARCH_COLUMNS};
use crate::query::{CountMode, Query, Table};
use crate::scan::{scan_pages, EXPORT_MAX_PAGES};
use crate::{Database, DbResult};

/// Search, status and city filters in `updated_at` descending order.
fn lead_query(filter: &LeadFilter) -> Query {
    let mut query = Query::from(Table::Users);
    if let Some(term) = filter.search_term() {
        query = query.ilike_any(&LEAD_SEARCH_COLUMNS, term);
    }
    if let Some(status) = filter.status {
        query = query.eq("lead_status", status.as_str());
    }
    if let Some(city) = trimmed(&filter.city) {
        query = query.eq("user_city", city);
    }
    query.order("updated_at", false)
}

impl Database {
    pub async fn leads_page(&self, filter: &LeadFilter) -> DbResult<LeadsPage> {
        let page = filter.page;
        let page_size = filter.page_size.max(1);
        let (from, to) = page_bounds(page, page_size);

        let query = lead_query(filter)
            .count(CountMode::Exact)
            .range(from, to);
        let resp = self.source().execute(&query).await?;
        let leads: Vec<Lead> = resp.decode()?;
        let total = resp.total();

        Ok(LeadsPage {
            leads: leads.iter().map(transform_lead).collect(),
            total,
            page,
            page_size,
            has_more: has_more(page, page_size, total),
        })
    }

    /// Every lead matching `filter`, up to the export page ceiling.
    pub async fn export_leads(&self, filter: &LeadFilter) -> DbResult<Vec<DisplayLead>> {
        let mut leads = Vec::new();
        scan_pages::<Lead, _>(self.source(), &lead_query(filter), EXPORT_MAX_PAGES, |lead| {
            leads.push(transform_lead(&lead));
        })
        .await?;
        Ok(leads)
    }

    /// The lead whose phone number is `phone`, if any.
    pub async fn conversation_lead(&self, phone: &str) -> DbResult<Option<Lead>> {
        let query = Query::from(Table::Users).eq("phone_number", phone).limit(1);
        let resp = self.source().execute(&query).await?;
        Ok(resp.decode::<Lead>()?.into_iter().next())
    }
}
