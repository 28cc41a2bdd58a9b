//! Bounded HTTP download of HTML pages.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

pub(crate) const MAX_RESPONSE_BYTES: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("fetch timed out after {0}s")]
    Timeout(u64),

    #[error("fetch failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,
}

/// A downloaded page: the URL after redirects and the decoded body.
#[derive(Debug)]
pub struct Download {
    pub final_url: Url,
    pub html: String,
}

pub async fn download(client: &Client, url: &Url, timeout: Duration) -> Result<Download, FetchError> {
    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            FetchError::Timeout(timeout.as_secs())
        } else {
            FetchError::Http(e)
        }
    };

    let response = client
        .get(url.clone())
        .header("User-Agent", crate::USER_AGENT)
        .timeout(timeout)
        .send()
        .await
        .map_err(map_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(FetchError::TooLarge);
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await.map_err(map_err)? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::TooLarge);
        }
    }

    let html = decode_body(&body, content_type.as_deref());
    debug!(url = %final_url, bytes = body.len(), "page downloaded");
    Ok(Download { final_url, html })
}

/// Decode using the `charset` of the Content-Type header, defaulting to UTF-8.
/// A byte-order mark takes precedence over the header.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        debug!(encoding = used.name(), "body contained malformed sequences");
    }
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}
