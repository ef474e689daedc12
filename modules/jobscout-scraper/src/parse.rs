//! HTML extraction for search result pages and job detail pages.
//!
//! Markup varies between page renditions, so every field is pulled through
//! a list of selector fallbacks and degrades to empty/None when the
//! expected structure is absent. Parsing never fails a descriptor.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use jobscout_common::{JobDetail, JobListing};

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Collapse an element's text nodes into one whitespace-normalized string.
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> String {
    for css in selectors {
        if let Some(found) = scope.select(&sel(css)).next() {
            let text = text_of(found);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

// --- Search page ---

/// Extract job cards from a search result page. Unrecognizable markup
/// yields an empty list, not an error.
pub fn parse_search_page(html: &str) -> Vec<JobListing> {
    let doc = Html::parse_document(html);

    let mut cards: Vec<ElementRef<'_>> = doc
        .select(&sel("ul.jobs-search__results-list > li"))
        .collect();
    if cards.is_empty() {
        cards = doc.select(&sel(".base-card")).collect();
    }

    let mut listings = Vec::new();
    for card in cards {
        if let Some(listing) = parse_job_card(card) {
            listings.push(listing);
        }
    }
    listings
}

fn parse_job_card(card: ElementRef<'_>) -> Option<JobListing> {
    let link = card
        .select(&sel("a.base-card__full-link, a[href*=\"/jobs/view/\"]"))
        .next()?;
    let mut url = link.value().attr("href")?.to_string();
    if !url.starts_with("http") {
        url = format!("https://www.linkedin.com{url}");
    }

    let job_id = extract_job_id(&url);
    if job_id.is_empty() {
        return None;
    }

    let title = first_text(
        card,
        &["h3.base-search-card__title", ".job-search-card__title", "h3"],
    );
    let company = first_text(
        card,
        &[
            "h4.base-search-card__subtitle a",
            ".base-search-card__subtitle",
            "h4 a",
        ],
    );
    let location = first_text(
        card,
        &[".job-search-card__location", ".base-search-card__metadata"],
    );
    let posted = first_text(card, &["time", ".job-search-card__listdate"]);

    let haystack = format!("{} {}", title, location).to_lowercase();
    let is_remote = haystack.contains("remote")
        || haystack.contains("hybrid")
        || haystack.contains("work from home");
    let is_easy_apply = text_of(card).to_lowercase().contains("easy apply");

    Some(JobListing {
        url,
        job_id,
        title,
        company,
        location,
        posted: if posted.is_empty() { None } else { Some(posted) },
        is_remote,
        is_easy_apply,
    })
}

// --- Detail page ---

/// Extract structured fields from a job detail page.
pub fn parse_job_detail(html: &str, now: DateTime<Utc>) -> JobDetail {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let title = first_text(root, &["h1.top-card-layout__title", "h1"]);
    let company = first_text(
        root,
        &["a.topcard__org-name-link", ".topcard__org-name-link", "h4 a"],
    );
    let location = first_text(
        root,
        &[".topcard__flavor--bullet", ".top-card-layout__second-subline"],
    );
    let description = first_text(
        root,
        &[
            ".show-more-less-html__markup",
            ".description__text",
            ".jobs-description__content",
        ],
    );

    let mut detail = JobDetail {
        title,
        company,
        location,
        description,
        ..JobDetail::default()
    };

    // Criteria rows carry seniority / employment type / salary as
    // subheader+text pairs.
    for item in doc.select(&sel(".description__job-criteria-item")) {
        let label = first_text(item, &[".description__job-criteria-subheader"]).to_lowercase();
        let value = first_text(item, &[".description__job-criteria-text"]);
        if value.is_empty() {
            continue;
        }
        if label.contains("seniority") || label.contains("experience") {
            detail.seniority = Some(value);
        } else if label.contains("employment") || label.contains("type") {
            detail.employment_type = Some(value);
        } else if label.contains("salary") || label.contains("pay") {
            detail.salary = Some(value);
        }
    }

    detail.skills = doc
        .select(&sel(".jobs-ppc-criteria__list li, .job-details-skill"))
        .map(text_of)
        .filter(|s| s.len() > 2 && s.len() < 100)
        .take(15)
        .collect();

    let posted_text = first_text(root, &["span.posted-time-ago__text", "time"]);
    detail.posted_at = parse_posted_date(&posted_text, now);

    detail
}

// --- Helpers ---

/// Job-id patterns, most specific first.
static JOB_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"jobPosting:(\d+)",
        r"currentJobId=(\d+)",
        r"/jobs/view/[^?#]*?(\d+)(?:[/?#]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static POSTED_AGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s+(minute|hour|day|week|month)s?\s+ago").expect("valid regex")
});

/// Pull the numeric job id out of a posting URL. Falls back to the last
/// path segment when no known pattern matches.
pub fn extract_job_id(url: &str) -> String {
    for re in JOB_ID_PATTERNS.iter() {
        if let Some(cap) = re.captures(url) {
            return cap[1].to_string();
        }
    }

    url.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .map(|s| s.split('?').next().unwrap_or(s).to_string())
        .unwrap_or_default()
}

/// Parse a relative posted date ("3 days ago") into a timestamp.
pub fn parse_posted_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(cap) = POSTED_AGO.captures(text) {
        let amount: i64 = cap[1].parse().ok()?;
        let delta = match cap[2].to_lowercase().as_str() {
            "minute" => Duration::minutes(amount),
            "hour" => Duration::hours(amount),
            "day" => Duration::days(amount),
            "week" => Duration::weeks(amount),
            "month" => Duration::days(amount * 30),
            _ => return None,
        };
        return Some(now - delta);
    }

    text.trim()
        .parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| Some(now).filter(|_| text.to_lowercase().contains("just now")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
    <html><body>
      <ul class="jobs-search__results-list">
        <li>
          <div class="base-card">
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/python-developer-at-acme-3795462103?refId=x">link</a>
            <h3 class="base-search-card__title"> Python Developer </h3>
            <h4 class="base-search-card__subtitle"><a>Acme Corp</a></h4>
            <span class="job-search-card__location">Jaipur, Rajasthan (Remote)</span>
            <time>2 days ago</time>
          </div>
        </li>
        <li>
          <div class="base-card">
            <a href="/jobs/view/react-engineer-at-globex-3795462999">link</a>
            <h3>React Engineer</h3>
            <h4><a>Globex</a></h4>
            <span class="job-search-card__location">Jaipur</span>
            <span>Easy Apply</span>
          </div>
        </li>
        <li><div class="not-a-card">advert</div></li>
      </ul>
    </body></html>
    "#;

    const DETAIL_PAGE: &str = r#"
    <html><body>
      <h1 class="top-card-layout__title">Python Developer</h1>
      <a class="topcard__org-name-link">Acme Corp</a>
      <span class="topcard__flavor--bullet">Jaipur, Rajasthan</span>
      <span class="posted-time-ago__text">3 days ago</span>
      <div class="show-more-less-html__markup">Build services in Python and Django.</div>
      <li class="description__job-criteria-item">
        <h3 class="description__job-criteria-subheader">Seniority level</h3>
        <span class="description__job-criteria-text">Mid-Senior level</span>
      </li>
      <li class="description__job-criteria-item">
        <h3 class="description__job-criteria-subheader">Employment type</h3>
        <span class="description__job-criteria-text">Full-time</span>
      </li>
    </body></html>
    "#;

    #[test]
    fn search_page_yields_one_listing_per_card() {
        let listings = parse_search_page(SEARCH_PAGE);
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.job_id, "3795462103");
        assert_eq!(first.title, "Python Developer");
        assert_eq!(first.company, "Acme Corp");
        assert!(first.is_remote);

        let second = &listings[1];
        assert_eq!(second.job_id, "3795462999");
        assert!(second.url.starts_with("https://www.linkedin.com/jobs/view/"));
        assert!(second.is_easy_apply);
        assert!(!second.is_remote);
    }

    #[test]
    fn junk_html_degrades_to_empty_list() {
        assert!(parse_search_page("<html><body><p>nothing here</p></body></html>").is_empty());
        assert!(parse_search_page("not even html").is_empty());
    }

    #[test]
    fn detail_page_extracts_criteria() {
        let now = Utc::now();
        let detail = parse_job_detail(DETAIL_PAGE, now);
        assert_eq!(detail.title, "Python Developer");
        assert_eq!(detail.company, "Acme Corp");
        assert_eq!(detail.seniority.as_deref(), Some("Mid-Senior level"));
        assert_eq!(detail.employment_type.as_deref(), Some("Full-time"));
        assert!(detail.description.contains("Django"));
        let posted = detail.posted_at.expect("posted date");
        assert_eq!((now - posted).num_days(), 3);
    }

    #[test]
    fn detail_page_degrades_on_missing_structure() {
        let detail = parse_job_detail("<html><body></body></html>", Utc::now());
        assert!(detail.title.is_empty());
        assert!(detail.description.is_empty());
        assert!(detail.seniority.is_none());
        assert!(detail.posted_at.is_none());
    }

    #[test]
    fn job_id_from_known_url_shapes() {
        assert_eq!(
            extract_job_id("https://www.linkedin.com/jobs/view/python-developer-at-acme-3795462103"),
            "3795462103"
        );
        assert_eq!(
            extract_job_id("https://www.linkedin.com/jobs/search?currentJobId=123456"),
            "123456"
        );
        assert_eq!(extract_job_id("urn:li:jobPosting:987654"), "987654");
        // Unknown shape falls back to the last path segment.
        assert_eq!(extract_job_id("https://example.com/opening/abc?x=1"), "abc");
    }

    #[test]
    fn relative_posted_dates() {
        let now = Utc::now();
        let two_hours = parse_posted_date("2 hours ago", now).expect("parsed");
        assert_eq!((now - two_hours).num_hours(), 2);

        let one_week = parse_posted_date("1 week ago", now).expect("parsed");
        assert_eq!((now - one_week).num_days(), 7);

        assert!(parse_posted_date("", now).is_none());
        assert!(parse_posted_date("Recently", now).is_none());
    }
}
