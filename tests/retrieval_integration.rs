//! End-to-end retrieval runs against mock Scholar, PMC search, and PMC article hosts.

mod support;

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use retriever_core::{
    HttpTimeouts, RetrievalError, RetrievalRequest, Retriever, RetrieverSettings, SourceSelection,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use support::{fast_retry_policy, pdf_body, pmc_landing_page, pmc_results_page, scholar_response};

fn settings(server: &MockServer, output: &Path, serpapi_key: Option<&str>) -> RetrieverSettings {
    RetrieverSettings {
        output_dir: output.to_path_buf(),
        serpapi_key: serpapi_key.map(ToString::to_string),
        scholar_endpoint: format!("{}/search", server.uri()),
        pubmed_search_url: format!("{}/pmc/", server.uri()),
        pmc_base_url: format!("{}/pmc", server.uri()),
        concurrency: 4,
        page_delay: Duration::ZERO,
        download_delay: Duration::ZERO,
        retry_policy: fast_retry_policy(),
        timeouts: HttpTimeouts::uniform(5),
    }
}

/// Serves a landing page for whichever PMC id is in the request path.
struct LandingPage;

impl Respond for LandingPage {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request
            .url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string();
        ResponseTemplate::new(200).set_body_string(pmc_landing_page(&id))
    }
}

async fn mount_scholar(server: &MockServer, count: usize) {
    let links: Vec<String> = (1..=count)
        .map(|i| format!("{}/files/paper{i}.pdf", server.uri()))
        .collect();
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scholar_response(&links)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"organic_results": []}"#))
        .mount(server)
        .await;
}

async fn mount_pubmed(server: &MockServer, count: usize) {
    let ids: Vec<String> = (1..=count).map(|i| format!("PMC{}", 1000 + i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    Mock::given(method("GET"))
        .and(path("/pmc/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pmc_results_page(&refs)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pmc/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pmc_results_page(&[])))
        .mount(server)
        .await;
}

async fn mount_pdf_hosts(server: &MockServer) {
    let pdf = || {
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/pdf")
            .set_body_bytes(pdf_body())
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/files/paper\d+\.pdf$"))
        .respond_with(pdf())
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/pmc/articles/PMC\d+/pdf/$"))
        .respond_with(pdf())
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/pmc/articles/PMC\d+/$"))
        .respond_with(LandingPage)
        .mount(server)
        .await;
}

fn pdf_names(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".pdf"))
        .collect()
}

fn expected_names(term: &str, count: usize) -> BTreeSet<String> {
    (1..=count).map(|n| format!("{term}{n}.pdf")).collect()
}

#[tokio::test]
async fn test_both_sources_split_even_budget() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_scholar(&server, 8).await;
    mount_pubmed(&server, 8).await;
    mount_pdf_hosts(&server).await;

    let retriever = Retriever::new(settings(&server, temp.path(), Some("key"))).unwrap();
    let request = RetrievalRequest::new(vec!["cancer".into()], SourceSelection::Both, 10);
    let summary = retriever.retrieve(&request).await.unwrap();

    assert_eq!(summary.google_scholar.len(), 5);
    assert_eq!(summary.pubmed.len(), 5);
    assert_eq!(summary.stored_count(), 10);

    let scholar_dir = temp.path().join("Both").join("Scholar").join("cancer");
    let pubmed_dir = temp.path().join("Both").join("PubMed").join("cancer");
    assert_eq!(pdf_names(&scholar_dir), expected_names("cancer", 5));
    assert_eq!(pdf_names(&pubmed_dir), expected_names("cancer", 5));

    for record in &summary.stored_pdfs {
        assert!(record.path.exists(), "missing {}", record.path.display());
    }
}

#[tokio::test]
async fn test_both_sources_odd_budget_favors_scholar() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_scholar(&server, 8).await;
    mount_pubmed(&server, 8).await;
    mount_pdf_hosts(&server).await;

    let retriever = Retriever::new(settings(&server, temp.path(), Some("key"))).unwrap();
    let request = RetrievalRequest::new(vec!["cancer".into()], SourceSelection::Both, 11);
    let summary = retriever.retrieve(&request).await.unwrap();

    assert_eq!(summary.google_scholar.len(), 6);
    assert_eq!(summary.pubmed.len(), 5);
}

#[tokio::test]
async fn test_pubmed_only_files_under_provider_tree() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_pubmed(&server, 3).await;
    mount_pdf_hosts(&server).await;

    let retriever = Retriever::new(settings(&server, temp.path(), None)).unwrap();
    let request = RetrievalRequest::new(
        vec!["heart disease".into()],
        SourceSelection::PubMed,
        3,
    );
    let summary = retriever.retrieve(&request).await.unwrap();

    assert!(summary.google_scholar.is_empty());
    assert_eq!(summary.pubmed.len(), 3);

    let dir = temp.path().join("PubMed").join("heart disease");
    assert_eq!(pdf_names(&dir), expected_names("heart disease", 3));
    assert!(!temp.path().join("Both").exists());

    let recorded: BTreeSet<_> = summary.stored_pdfs.iter().map(|r| r.path.clone()).collect();
    let on_disk: BTreeSet<_> = expected_names("heart disease", 3)
        .into_iter()
        .map(|name| dir.join(name))
        .collect();
    assert_eq!(recorded, on_disk);
}

#[tokio::test]
async fn test_scholar_failure_does_not_block_pubmed() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_pubmed(&server, 4).await;
    mount_pdf_hosts(&server).await;

    let retriever = Retriever::new(settings(&server, temp.path(), None)).unwrap();
    let request = RetrievalRequest::new(vec!["cancer".into()], SourceSelection::Both, 4);
    let summary = retriever.retrieve(&request).await.unwrap();

    assert!(summary.google_scholar.is_empty());
    assert_eq!(summary.pubmed.len(), 2);
    assert_eq!(summary.stored_count(), 2);
}

#[tokio::test]
async fn test_every_source_failing_is_an_error() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/pmc/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = Retriever::new(settings(&server, temp.path(), None)).unwrap();
    let request = RetrievalRequest::new(vec!["cancer".into()], SourceSelection::Both, 10);
    let error = retriever.retrieve(&request).await.unwrap_err();

    assert!(matches!(error, RetrievalError::AllSourcesFailed { .. }));
    assert!(!error.is_validation());
}

#[tokio::test]
async fn test_invalid_request_makes_no_requests() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let retriever = Retriever::new(settings(&server, temp.path(), Some("key"))).unwrap();
    for request in [
        RetrievalRequest::new(vec!["cancer".into()], SourceSelection::Both, 0),
        RetrievalRequest::new(vec!["cancer".into()], SourceSelection::Both, 101),
        RetrievalRequest::new(vec!["   ".into()], SourceSelection::PubMed, 5),
    ] {
        let error = retriever.retrieve(&request).await.unwrap_err();
        assert!(error.is_validation(), "unexpected error {error}");
    }
}

#[tokio::test]
async fn test_renamed_files_are_listed_relative_to_root() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_pubmed(&server, 2).await;
    mount_pdf_hosts(&server).await;

    let retriever = Retriever::new(settings(&server, temp.path(), None)).unwrap();
    let request = RetrievalRequest::new(vec!["tumor".into()], SourceSelection::PubMed, 2);
    retriever.retrieve(&request).await.unwrap();

    let listed = retriever.layout().list_stored_files().unwrap();
    let listed: Vec<String> = listed
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(listed, vec!["PubMed/tumor/tumor1.pdf", "PubMed/tumor/tumor2.pdf"]);
}
