//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the crawler's user agent
//! - GET requests for target pages under an overall timeout
//! - A capped redirect chain that accepts the last response instead of failing
//! - Mapping transport failures and error statuses to attempt errors

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::AttemptError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code of the final response (always below 400)
    pub status_code: u16,

    /// Page body content
    pub body: String,
}

/// Builds the HTTP client shared by the fetcher and the prober
///
/// The redirect policy follows at most `max-redirects` hops. When the chain is
/// longer, the policy stops following and the redirect response itself is
/// returned to the caller rather than an error.
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetcher` - Timeout and redirect limits
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use pagescope::config::{FetcherConfig, UserAgentConfig};
/// use pagescope::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetcher: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    let max_redirects = fetcher.max_redirects;
    let redirect_policy = Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.stop()
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(fetcher.timeout_secs))
        .connect_timeout(Duration::from_secs(
            CONNECT_TIMEOUT_SECS.min(fetcher.timeout_secs),
        ))
        .redirect(redirect_policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a target page with a single GET request
///
/// # Returns
///
/// * `Ok(FetchedPage)` - The final response had a status below 400
/// * `Err(AttemptError::Fetch)` - The request could not be sent or timed out
/// * `Err(AttemptError::HttpStatus)` - The final response status was 400 or above
/// * `Err(AttemptError::Parse)` - The body could not be read as a document
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, AttemptError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(AttemptError::Fetch)?;

    let status = response.status();
    let final_url = response.url().clone();

    if status.as_u16() >= 400 {
        return Err(AttemptError::HttpStatus(status.as_u16()));
    }

    if final_url != *url {
        tracing::debug!(url = %url, final_url = %final_url, "Followed redirects");
    }

    let body = response
        .text()
        .await
        .map_err(|e| AttemptError::Parse(e.to_string()))?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body,
    })
}
