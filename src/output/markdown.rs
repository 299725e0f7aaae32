//! Markdown export of a job's result
//!
//! This module renders a crawl result as a markdown document, including the
//! structural summary and the broken-link table.

use crate::output::or_dash;
use crate::storage::CrawlResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a job's result as markdown
///
/// # Arguments
///
/// * `result` - The job and its broken links
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(std::io::Error)` - Failed to write the file
pub fn write_result_markdown(result: &CrawlResult, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_result_markdown(result);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a job's result as markdown
pub fn format_result_markdown(result: &CrawlResult) -> String {
    let job = &result.job;
    let mut md = String::new();

    md.push_str(&format!("# Crawl Report: {}\n\n", job.url));

    md.push_str("## Job\n\n");
    md.push_str(&format!("- **ID**: {}\n", job.id));
    md.push_str(&format!("- **Status**: {}\n", job.status));
    md.push_str(&format!(
        "- **Last Crawled**: {}\n",
        or_dash(job.last_crawled_at.as_deref())
    ));
    if let Some(error) = &job.error_message {
        md.push_str(&format!("- **Error**: {}\n", error));
    }
    md.push('\n');

    md.push_str("## Page Structure\n\n");
    md.push_str(&format!(
        "- **Title**: {}\n",
        escape_cell(or_dash(job.title.as_deref()))
    ));
    md.push_str(&format!(
        "- **HTML Version**: {} (approximate)\n",
        or_dash(job.html_version.as_deref())
    ));
    md.push_str(&format!(
        "- **Login Form**: {}\n\n",
        if job.has_login_form { "yes" } else { "no" }
    ));

    md.push_str("| Heading | Count |\n");
    md.push_str("|---------|-------|\n");
    for level in 1..=6u8 {
        md.push_str(&format!("| h{} | {} |\n", level, job.headings.get(level)));
    }
    md.push('\n');

    md.push_str("## Links\n\n");
    md.push_str(&format!("- **Internal**: {}\n", job.internal_links));
    md.push_str(&format!("- **External**: {}\n", job.external_links));
    md.push_str(&format!(
        "- **Inaccessible (latest attempt)**: {}\n\n",
        job.inaccessible_links
    ));

    if result.broken_links.is_empty() {
        md.push_str("No broken links recorded.\n");
    } else {
        md.push_str(&format!(
            "### Broken Links ({})\n\n",
            result.broken_links.len()
        ));
        md.push_str("| URL | Status | Error | Found |\n");
        md.push_str("|-----|--------|-------|-------|\n");
        for link in &result.broken_links {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&link.url),
                link.status_code,
                escape_cell(&link.error_message),
                link.created_at
            ));
        }
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
