use std::io::Write;
use std::time::Duration;

use reqwest::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};
use url::Url;

use crate::cli::Args;
use crate::gemini::{GeminiClient, GeminiError};
use crate::search::engine::{self, ResearchError, ResearchReport, ResearchRequest};
use crate::search::report::format_report;
use crate::serp::SerpClient;
use crate::site::SiteCrawler;
use crate::store::{LocalStoreFactory, ResearchMemory, StoreError};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout; per-request timeouts are shorter.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 5;
/// Earlier findings pulled into each summary prompt.
const CONTEXT_TOP_K: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("cannot build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Research(#[from] ResearchError),
}

/// One research session: shared API clients plus the session's vector store
/// collection. Each query gets its own crawler, so pages are fetched at most
/// once per query.
pub struct App {
    http: Client,
    serp: SerpClient,
    gemini: GeminiClient,
    memory: ResearchMemory<LocalStoreFactory<GeminiClient>>,
    site_url: Url,
    result_count: u8,
    show_results: bool,
}

impl App {
    pub fn new(args: &Args) -> Result<Self, AppError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        let gemini = GeminiClient::from_env(http.clone())?;
        let serp = SerpClient::from_env(http.clone());
        Self::from_parts(http, serp, gemini, args)
    }

    fn from_parts(
        http: Client,
        serp: SerpClient,
        gemini: GeminiClient,
        args: &Args,
    ) -> Result<Self, AppError> {
        let factory = LocalStoreFactory::new(&args.store_dir, gemini.clone());
        let memory = ResearchMemory::open(factory, CONTEXT_TOP_K)?;
        Ok(Self {
            http,
            serp,
            gemini,
            memory,
            site_url: args.site_url.clone(),
            result_count: args.results,
            show_results: args.show_results,
        })
    }

    pub fn collection(&self) -> &str {
        self.memory.collection()
    }

    pub async fn research(&mut self, query: &str) -> Result<ResearchReport, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::EmptyQuery);
        }

        info!(query, "research started");

        let mut crawler = SiteCrawler::new(self.http.clone(), self.site_url.clone());
        let req = ResearchRequest {
            query,
            result_count: self.result_count,
        };
        let report =
            engine::research(&self.serp, &mut crawler, &mut self.memory, &self.gemini, &req).await?;
        Ok(report)
    }

    /// Research `query` and render the Markdown report.
    pub async fn run(&mut self, query: &str) -> Result<String, AppError> {
        let report = self.research(query).await?;
        Ok(format_report(&report, query.trim(), self.show_results))
    }

    /// Research one query per input line until EOF, writing each report to
    /// `out`. Blank lines are skipped. A failed query is logged and the
    /// session continues with the next line.
    pub async fn interactive(
        &mut self,
        input: impl AsyncBufRead + Unpin,
        out: &mut impl Write,
    ) -> std::io::Result<()> {
        let mut lines = input.lines();
        loop {
            eprint!("query> ");
            std::io::stderr().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match self.run(&line).await {
                Ok(report) => writeln!(out, "{report}")?,
                Err(e) => {
                    error!(query = line.trim(), error = %e, "query failed");
                    eprintln!("error: {e}");
                }
            }
        }
        eprintln!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROOT_HTML: &str = r#"<html><body>
        <h1>Developer Roadmaps</h1>
        <a href="/roadmaps/data-science">Data Science</a>
        <a href="/guides/sql">SQL Basics</a>
    </body></html>"#;

    fn app(server: &MockServer, store_dir: &std::path::Path, extra: &[&str]) -> App {
        let mut argv = vec![
            "career-scout".to_string(),
            "--site-url".to_string(),
            server.uri(),
            "--store-dir".to_string(),
            store_dir.display().to_string(),
        ];
        argv.extend(extra.iter().map(|a| a.to_string()));
        let args = Args::try_parse_from(argv).unwrap();

        let http = Client::new();
        let serp = SerpClient::with_base_url(http.clone(), &format!("{}/search.json", server.uri()));
        let gemini = GeminiClient::with_base_url(http.clone(), &format!("{}/v1beta/models", server.uri()));
        App::from_parts(http, serp, gemini, &args).unwrap()
    }

    async fn mount_backends(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [{"title": "Data Scientist Jobs", "link": "https://jobs.example.com/ds"}],
                "related_questions": [{"question": "What does a data scientist do?"}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ROOT_HTML))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/roadmaps/data-science"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<h1>Data Science</h1><p>Statistics and Python.</p>"),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r":embedContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": {"values": [0.5, 0.5, 0.1]}
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"parts": [{"text": "## Overview\nData science blends statistics and code."}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn rejects_blank_query() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&server, dir.path(), &[]);

        let err = app.run("   ").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyQuery));
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn end_to_end_report() {
        let server = MockServer::start().await;
        mount_backends(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&server, dir.path(), &["--show-results"]);

        let output = app.run("Data Science").await.unwrap();

        assert!(output.starts_with("# Research: Data Science\n\n## Overview"));
        assert!(output.contains("- **Roadmap: Data Science**: Data Science Statistics and Python."));
        assert!(!output.contains("Guide: SQL Basics"));
        assert!(output.contains("[Data Scientist Jobs](https://jobs.example.com/ds)"));
        assert!(output.contains("```json"));

        let stored = dir.path().join(format!("{}.jsonl", app.collection()));
        assert!(stored.exists(), "collection file missing: {}", stored.display());
    }

    #[tokio::test]
    async fn each_query_crawls_the_site_again() {
        let server = MockServer::start().await;
        mount_backends(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&server, dir.path(), &[]);

        let first = app.research("Data Science").await.unwrap();
        let second = app.research("data").await.unwrap();

        assert_eq!(first.combined.roadmap_sh.len(), 1);
        assert_eq!(second.combined.roadmap_sh.len(), 1);
        assert_eq!(second.context.len(), 1, "first query's findings should be recalled");
    }

    #[tokio::test]
    async fn interactive_session_survives_a_failed_query() {
        let server = MockServer::start().await;
        // Both the first write and its retry hit a failing embedder.
        Mock::given(method("POST"))
            .and(path_regex(r":embedContent$"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        mount_backends(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&server, dir.path(), &[]);
        let first_collection = app.collection().to_string();

        let input: &[u8] = b"broken query\n\n   \nData Science\n";
        let mut out = Vec::new();
        app.interactive(input, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("# Research: broken query"));
        assert_eq!(out.matches("# Research: ").count(), 1);
        assert!(out.contains("# Research: Data Science"));
        assert_ne!(app.collection(), first_collection);
        assert!(dir.path().join(format!("{}.jsonl", app.collection())).exists());
    }
}
