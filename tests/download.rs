use chrono::{Duration as ChronoDuration, Utc};
use rodin3d::{DownloadFetcher, DownloadLink, ErrorKind};
use std::fs;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn link(server: &MockServer, file_path: &str, name: &str) -> DownloadLink {
    DownloadLink::new(Url::parse(&format!("{}{}", server.uri(), file_path)).unwrap(), name)
}

fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_fetch_writes_every_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/base_basic_pbr.glb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("dummy model data"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/preview.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("dummy preview"))
        .expect(1)
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let out = dest.path().join("nested");
    let fetcher = DownloadFetcher::new().unwrap();
    let result = fetcher
        .fetch(
            vec![
                link(&server, "/files/base_basic_pbr.glb", "base_basic_pbr.glb"),
                link(&server, "/files/preview.webp", "preview.webp"),
            ],
            &out,
        )
        .await
        .unwrap();

    assert_eq!(result.files.len(), 2);
    assert_eq!(
        fs::read_to_string(&result.files[0]).unwrap(),
        "dummy model data"
    );
    assert_eq!(entries(&out), vec!["base_basic_pbr.glb", "preview.webp"]);
}

#[tokio::test]
async fn test_name_falls_back_to_url_and_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/model.fbx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("fbx"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/texture.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("png"))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let fetcher = DownloadFetcher::new().unwrap();
    let result = fetcher
        .fetch(
            vec![
                link(&server, "/files/model.fbx", ""),
                link(&server, "/files/texture.png", "../../escape.png"),
            ],
            dest.path(),
        )
        .await
        .unwrap();

    assert_eq!(result.files[0], dest.path().join("model.fbx"));
    assert_eq!(result.files[1], dest.path().join("escape.png"));
}

#[tokio::test]
async fn test_expired_link_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/model.glb"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Request has expired"))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let fetcher = DownloadFetcher::new().unwrap();
    let err = fetcher
        .fetch(vec![link(&server, "/files/model.glb", "model.glb")], dest.path())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExpiredLink);
    assert!(entries(dest.path()).is_empty());
}

#[tokio::test]
async fn test_link_past_its_window_is_not_requested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("data"))
        .expect(0)
        .mount(&server)
        .await;

    let mut stale = link(&server, "/files/model.glb", "model.glb");
    stale.issued_at = Utc::now() - ChronoDuration::minutes(11);
    assert!(stale.is_expired_at(Utc::now()));

    let dest = tempfile::tempdir().unwrap();
    let err = DownloadFetcher::new()
        .unwrap()
        .fetch(vec![stale], dest.path())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExpiredLink);
}

#[tokio::test]
async fn test_empty_body_is_not_a_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/model.glb"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let err = DownloadFetcher::new()
        .unwrap()
        .fetch(vec![link(&server, "/files/model.glb", "model.glb")], dest.path())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(entries(dest.path()).is_empty());
}

#[tokio::test]
async fn test_colliding_names_are_kept_apart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a/model.glb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("AAAA"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b/model.glb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("BB"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c/model.glb"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("C"))
        .mount(&server)
        .await;

    let dest = tempfile::tempdir().unwrap();
    let result = DownloadFetcher::new()
        .unwrap()
        .fetch(
            vec![
                link(&server, "/a/model.glb", ""),
                link(&server, "/b/model.glb", ""),
                link(&server, "/c/model.glb", "model.glb"),
            ],
            dest.path(),
        )
        .await
        .unwrap();

    assert_eq!(
        result.files,
        vec![
            dest.path().join("model.glb"),
            dest.path().join("model (1).glb"),
            dest.path().join("model (2).glb"),
        ]
    );
    assert_eq!(fs::read_to_string(&result.files[0]).unwrap(), "AAAA");
    assert_eq!(fs::read_to_string(&result.files[1]).unwrap(), "BB");
    assert_eq!(
        entries(dest.path()),
        vec!["model (1).glb", "model (2).glb", "model.glb"]
    );
}
