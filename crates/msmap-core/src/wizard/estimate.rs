use crate::{DocType, MapNode};

const WORKDAY_MINUTES: u32 = 480;

/// Fixed effort per document type, in minutes.
pub fn minutes_for(doc_type: DocType) -> u32 {
    match doc_type {
        DocType::Policy => 30,
        DocType::Procedure => 60,
        DocType::WorkInstruction => 45,
        DocType::Sop => 45,
        DocType::RiskAssessment => 90,
        DocType::Form => 15,
        DocType::Record => 10,
        DocType::Training => 120,
        DocType::ExternalStandard => 0,
        DocType::Other => 30,
    }
}

pub fn total_minutes(path: &[&MapNode]) -> u32 {
    path.iter().map(|n| minutes_for(n.doc_type)).sum()
}

/// "N minutes" under an hour, "Hh Mm" under a workday, otherwise whole days.
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        format!("{} minutes", minutes)
    } else if minutes < WORKDAY_MINUTES {
        let (hours, rest) = (minutes / 60, minutes % 60);
        if rest == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, rest)
        }
    } else {
        let days = minutes.div_ceil(WORKDAY_MINUTES);
        format!("{} day{}", days, if days == 1 { "" } else { "s" })
    }
}

pub fn estimate_time(path: &[&MapNode]) -> String {
    format_duration(total_minutes(path))
}
