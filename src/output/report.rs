//! Plain-text reports for the CLI

use crate::output::or_dash;
use crate::storage::{CrawlResult, JobPage};

/// Formats a job and its broken links as a multi-line report
pub fn format_result(result: &CrawlResult) -> String {
    let job = &result.job;
    let mut out = String::new();

    out.push_str(&format!("Job #{}: {}\n", job.id, job.url));
    out.push_str(&format!("  Status:        {}\n", job.status));
    out.push_str(&format!(
        "  Last crawled:  {}\n",
        or_dash(job.last_crawled_at.as_deref())
    ));

    if let Some(error) = &job.error_message {
        out.push_str(&format!("  Error:         {}\n", error));
    }

    out.push_str(&format!("  Title:         {}\n", or_dash(job.title.as_deref())));
    out.push_str(&format!(
        "  HTML version:  {}\n",
        or_dash(job.html_version.as_deref())
    ));
    out.push_str(&format!(
        "  Headings:      h1={} h2={} h3={} h4={} h5={} h6={}\n",
        job.headings.h1,
        job.headings.h2,
        job.headings.h3,
        job.headings.h4,
        job.headings.h5,
        job.headings.h6
    ));
    out.push_str(&format!(
        "  Links:         {} internal, {} external, {} inaccessible\n",
        job.internal_links, job.external_links, job.inaccessible_links
    ));
    out.push_str(&format!(
        "  Login form:    {}\n",
        if job.has_login_form { "yes" } else { "no" }
    ));

    if !result.broken_links.is_empty() {
        out.push_str(&format!("\nBroken links ({}):\n", result.broken_links.len()));
        for link in &result.broken_links {
            out.push_str(&format!(
                "  [{}] {} - {}\n",
                link.status_code, link.url, link.error_message
            ));
        }
    }

    out
}

/// Formats one page of a job listing as a table
pub fn format_job_page(page: &JobPage, page_number: u32, limit: u32) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:>6}  {:<9}  {:>5}  {:>5}  {:>5}  {}\n",
        "ID", "STATUS", "INT", "EXT", "BAD", "URL"
    ));
    for job in &page.jobs {
        out.push_str(&format!(
            "{:>6}  {:<9}  {:>5}  {:>5}  {:>5}  {}\n",
            job.id,
            job.status.to_string(),
            job.internal_links,
            job.external_links,
            job.inaccessible_links,
            job.url
        ));
    }

    let limit = u64::from(limit.max(1));
    let pages = ((page.total + limit - 1) / limit).max(1);
    out.push_str(&format!(
        "\nPage {} of {} ({} job(s) total)\n",
        page_number.max(1),
        pages,
        page.total
    ));

    out
}
