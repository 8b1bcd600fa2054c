//! Fallback scraper: schema.org `JobPosting` JSON-LD, then OpenGraph/meta tags.

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{Deadline, JobRecord};
use crate::scrape::{Page, Scraper};

pub struct SchemaOrgScraper;

impl Scraper for SchemaOrgScraper {
    fn site(&self) -> &str {
        "schema.org"
    }

    fn scrape(&self, page: &Page) -> JobRecord {
        let document = &page.document;
        let posting = job_postings(document).into_iter().next().unwrap_or_default();
        let organization = posting.get("hiringOrganization");

        let mut record = JobRecord {
            title: text_of(posting.get("title")),
            company: text_of(organization),
            created_at: text_of(posting.get("datePosted")),
            deadline: Deadline::from_raw(Some(text_of(posting.get("validThrough")).as_str())),
            url: text_of(posting.get("url")),
            location: location_of(posting.get("jobLocation")),
            industry: text_of(posting.get("industry")),
            job_function: text_of(posting.get("occupationalCategory")),
            keywords: first_non_empty([
                text_of(posting.get("keywords")),
                text_of(posting.get("skills")),
            ]),
            job_description: strip_html(&text_of(posting.get("description"))),
            company_description: match organization {
                Some(Value::Object(org)) => strip_html(&text_of(org.get("description"))),
                _ => String::new(),
            },
            ..Default::default()
        };

        if record.title.is_empty() {
            record.title = first_non_empty([meta(document, "og:title"), page_title(document)]);
        }
        if record.company.is_empty() {
            record.company = meta(document, "og:site_name");
        }
        if record.job_description.is_empty() {
            record.job_description =
                first_non_empty([meta(document, "og:description"), meta(document, "description")]);
        }
        record
    }
}

fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Every `JobPosting` object in the page's JSON-LD blocks, including `@graph` members.
fn job_postings(document: &Html) -> Vec<Map<String, Value>> {
    let mut postings = Vec::new();
    for script in select(document, r#"script[type="application/ld+json"]"#) {
        let body: String = script.text().collect();
        match serde_json::from_str::<Value>(body.trim()) {
            Ok(value) => collect_postings(value, &mut postings),
            Err(e) => debug!("Skipping unparseable JSON-LD block: {e}"),
        }
    }
    postings
}

fn collect_postings(value: Value, out: &mut Vec<Map<String, Value>>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_postings(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_postings(graph, out);
            }
            if is_job_posting(&map) {
                out.push(map);
            }
        }
        _ => {}
    }
}

fn is_job_posting(map: &Map<String, Value>) -> bool {
    match map.get("@type") {
        Some(Value::String(t)) => t == "JobPosting",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("JobPosting")),
        _ => false,
    }
}

/// Display text of a JSON-LD value: strings, numbers, `{name}` objects and lists of those.
fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(map)) => text_of(map.get("name")),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| text_of(Some(v)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn location_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| location_of(Some(v)))
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        Some(Value::Object(place)) => match place.get("address") {
            Some(Value::Object(address)) => first_non_empty([
                text_of(address.get("addressLocality")),
                text_of(address.get("addressRegion")),
                text_of(address.get("addressCountry")),
            ]),
            other => text_of(other),
        },
        other => text_of(other),
    }
}

fn strip_html(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(raw);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta(document: &Html, key: &str) -> String {
    let css = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
    select(document, &css)
        .into_iter()
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn page_title(document: &Html) -> String {
    select(document, "title")
        .first()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn first_non_empty<const N: usize>(candidates: [String; N]) -> String {
    candidates
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}
