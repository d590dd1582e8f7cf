// src/report.rs
//! Report rendering. The core treats the result as opaque.

use chrono::NaiveDate;
use html_escape::encode_text;
use std::fmt::Write as _;

use crate::partition::DayPartition;
use crate::record::PriceRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub html: String,
    pub text: String,
}

/// One source's slice of the report.
#[derive(Debug, Clone)]
pub struct Section {
    pub source_name: String,
    pub days: DayPartition,
}

pub fn render(task_id: &str, sections: &[Section], today: NaiveDate) -> Report {
    let total: usize = sections.iter().map(|s| s.days.current.len()).sum();
    let new: usize = sections
        .iter()
        .flat_map(|s| s.days.current.iter())
        .filter(|r| r.is_new)
        .count();

    let title = if new > 0 {
        format!("Price update {today}: {new} new of {total}")
    } else {
        format!("Price update {today}: {total} quotes")
    };

    let mut html = String::new();
    let mut text = String::new();
    let _ = writeln!(text, "{title}");
    let _ = write!(
        html,
        "<h3>{}</h3><p>task: {}</p>",
        encode_text(&title),
        encode_text(task_id)
    );

    for s in sections {
        let name = encode_text(&s.source_name);
        let _ = write!(html, "<h4>{name} &middot; {today}</h4>");
        let _ = writeln!(text, "\n== {} ({today}) ==", s.source_name);
        if s.days.current.is_empty() {
            html.push_str("<p>No quotes today yet.</p>");
            let _ = writeln!(text, "no quotes today yet");
        } else {
            html_table(&mut html, &s.days.current);
            for r in &s.days.current {
                let _ = writeln!(text, "{}", text_line(r));
            }
        }
        if !s.days.prior.is_empty() {
            let _ = write!(html, "<h4>{name} &middot; previous day</h4>");
            let _ = writeln!(text, "-- previous day --");
            html_table(&mut html, &s.days.prior);
            for r in &s.days.prior {
                let _ = writeln!(text, "{}", text_line(r));
            }
        }
    }

    Report { title, html, text }
}

fn html_table(out: &mut String, rows: &[PriceRecord]) {
    out.push_str(
        "<table border=\"1\" cellspacing=\"0\" cellpadding=\"4\">\
         <tr><th>Date</th><th>Product</th><th>Spec</th><th>Price</th><th>Vendor</th></tr>",
    );
    for r in rows {
        let marker = if r.is_new {
            " <b style=\"color:#d00\">NEW</b>"
        } else {
            ""
        };
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_text(&r.observation_date_text),
            encode_text(&r.raw_label),
            marker,
            encode_text(&r.specification),
            encode_text(&r.price),
            encode_text(&r.vendor),
        );
    }
    out.push_str("</table>");
}

fn text_line(r: &PriceRecord) -> String {
    format!(
        "{}{} | {} | {} | {} | {}",
        if r.is_new { "[NEW] " } else { "" },
        r.observation_date_text,
        r.raw_label,
        r.specification,
        r.price,
        r.vendor
    )
}
