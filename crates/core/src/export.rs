// crates/core/src/export.rs
//! CSV rendering for lead and conversation exports.

use crate::transform::{format_date, format_phone_number, truncate_text};
use crate::types::{ConversationSummary, DisplayLead};

pub const LEAD_COLUMNS: [&str; 14] = [
    "Name",
    "Phone",
    "Age",
    "Location",
    "Lead Status",
    "Appointment Date",
    "Appointment Time",
    "Source",
    "Spouse Info",
    "Trying Duration",
    "Previous Treatments",
    "Preferred Center",
    "Created",
    "Updated",
];

pub const CONVERSATION_COLUMNS: [&str; 8] = [
    "Phone",
    "Name",
    "City",
    "Age",
    "Lead Status",
    "Messages",
    "Last Activity",
    "Last Message",
];

/// Escape a CSV field: wrap in quotes and double embedded quotes when it
/// contains a comma, quote, or line break.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Builds a `\n`-separated CSV document. Line breaks inside fields are
/// flattened to spaces so every record occupies exactly one line.
#[derive(Debug, Clone)]
pub struct CsvBuilder {
    lines: Vec<String>,
}

impl CsvBuilder {
    pub fn new(headers: &[&str]) -> Self {
        let mut builder = Self { lines: Vec::new() };
        builder.row(headers.iter().copied());
        builder
    }

    pub fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = fields
            .into_iter()
            .map(|f| escape_csv_field(&flatten(f.as_ref())))
            .collect::<Vec<_>>()
            .join(",");
        self.lines.push(line);
    }

    /// Number of data rows, excluding the header.
    pub fn records(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

fn flatten(field: &str) -> String {
    field.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

pub fn leads_csv(leads: &[DisplayLead]) -> String {
    let mut csv = CsvBuilder::new(&LEAD_COLUMNS);
    for lead in leads {
        let age = lead.age.map(|a| a.to_string()).unwrap_or_default();
        csv.row([
            lead.name.as_str(),
            lead.phone.as_str(),
            age.as_str(),
            lead.location.as_str(),
            lead.lead_status.as_str(),
            opt(&lead.appointment_date),
            opt(&lead.appointment_time),
            lead.source.as_str(),
            lead.spouse_info.as_str(),
            opt(&lead.trying_duration),
            opt(&lead.previous_treatments),
            opt(&lead.preferred_center),
            format_date(&lead.created_at).as_str(),
            format_date(&lead.updated_at).as_str(),
        ]);
    }
    csv.finish()
}

pub fn conversations_csv(conversations: &[ConversationSummary]) -> String {
    let mut csv = CsvBuilder::new(&CONVERSATION_COLUMNS);
    for conv in conversations {
        csv.row([
            format_phone_number(&conv.phone),
            conv.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            conv.city.clone().unwrap_or_default(),
            conv.age.map(|a| a.to_string()).unwrap_or_default(),
            conv.lead_status
                .clone()
                .unwrap_or_else(|| "incomplete".to_string()),
            conv.message_count.to_string(),
            conv.last_activity.clone(),
            truncate_text(&conv.last_message, 100),
        ]);
    }
    csv.finish()
}
