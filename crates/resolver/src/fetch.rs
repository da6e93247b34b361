//! Page fetching.
//!
//! [`PageFetcher`] is the seam between the engine and the network. Status
//! codes come back in [`FetchResponse`]; only transport failures are errors.

use std::error::Error as _;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, redirect};
use rustls::ClientConfig;
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;

use crate::error::{FetchError, ResolveError};
use crate::session::FIREFOX_UA;

const MAX_REDIRECTS: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header set used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestProfile {
    /// The session headers as they are.
    #[default]
    Standard,
    /// Desktop Firefox UA and a plain `deflate` encoding, used to retry
    /// responses whose body could not be decoded.
    Alternate,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub headers: &'a HeaderMap,
    pub profile: RequestProfile,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: &'a str, headers: &'a HeaderMap) -> Self {
        Self {
            url,
            headers,
            profile: RequestProfile::Standard,
        }
    }

    pub fn with_profile(mut self, profile: RequestProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Headers actually sent for this request.
    pub fn effective_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if self.profile == RequestProfile::Alternate {
            headers.insert(USER_AGENT, HeaderValue::from_static(FIREFOX_UA));
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("deflate"));
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub text: String,
    /// URL after following redirects.
    pub final_url: String,
    /// URLs that answered with a redirect, oldest first.
    pub history: Vec<String>,
}

impl FetchResponse {
    pub fn ok(url: impl Into<String>, text: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            status: 200,
            text: text.into(),
            final_url: url,
            history: Vec::new(),
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `request.url`, following redirects.
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchResponse, FetchError>;
}

/// [`PageFetcher`] backed by a reqwest [`Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_default_client() -> Result<Self, ResolveError> {
        Ok(Self::new(default_client()?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(request.url)
            .headers(request.effective_headers())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        // reqwest keeps no per-hop history, the redirect policy logs the hops
        let history = if final_url != request.url {
            vec![request.url.to_owned()]
        } else {
            Vec::new()
        };

        let text = response.text().await.map_err(classify)?;

        Ok(FetchResponse {
            status,
            text,
            final_url,
            history,
        })
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if is_content_decoding_failure(&e) {
        FetchError::Encoding(e.to_string())
    } else {
        FetchError::Transport(e)
    }
}

/// reqwest reports every failed body read as a decode error. The gzip and
/// deflate decoders fail with a bare `io::Error` right under reqwest's own
/// errors; a dropped or truncated connection shows up as a hyper error there.
fn is_content_decoding_failure(e: &reqwest::Error) -> bool {
    if !e.is_decode() || e.is_timeout() {
        return false;
    }
    let mut source = e.source();
    while let Some(err) = source {
        if err.is::<reqwest::Error>() {
            source = err.source();
            continue;
        }
        return err.is::<io::Error>();
    }
    false
}

/// Client with rustls, a 30 second timeout and a redirect policy that logs
/// every hop.
pub fn default_client() -> Result<Client, ResolveError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_platform_verifier()?
        .with_no_client_auth();

    let client = Client::builder()
        .use_preconfigured_tls(tls_config)
        .redirect(logging_redirect_policy())
        .timeout(DEFAULT_TIMEOUT)
        .build()?;
    Ok(client)
}

fn logging_redirect_policy() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if let Some(previous) = attempt.previous().last() {
            debug!(
                status = attempt.status().as_u16(),
                from = %previous,
                to = %attempt.url(),
                "Redirect"
            );
        }
        attempt.follow()
    })
}
