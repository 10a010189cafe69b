use ambush_proxy::{
    Discovery, FileSource, ListingParser, ListingSource, ParseError, Validator, ValidatorConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn listing(rows: &[(u16, &str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(port, code, country)| {
            format!(
                "<tr><td>127.0.0.1</td><td>{}</td><td>{}</td><td>{}</td><td>no</td></tr>\n",
                port, code, country
            )
        })
        .collect();

    format!(
        "<html><body><table id=\"list\">\n<tr><th>IP Address</th><th>Port</th><th>Code</th><th>Country</th><th>Https</th></tr>\n{}</table></body></html>",
        body
    )
}

/// Bound but never listening, so the port refuses connections until dropped
fn closed_port() -> (TcpSocket, u16) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

#[tokio::test]
async fn parses_saved_listing_page() {
    let raw = FileSource::new(fixture("free_proxy_list.html"))
        .fetch()
        .await
        .unwrap();
    let candidates = ListingParser::new().parse(&raw).unwrap();

    let rows: Vec<_> = candidates
        .iter()
        .map(|c| (c.address.as_str(), c.port, c.country_code.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("203.0.113.10", 8080, "US"),
            ("198.51.100.7", 3128, "DE"),
            ("192.0.2.44", 80, "BR"),
            ("203.0.113.99", 8888, "JP"),
            ("203.0.113.10", 8080, "US"),
        ]
    );
    assert_eq!(candidates[1].country_name, "Germany");
}

#[tokio::test]
async fn parsing_same_page_twice_is_identical() {
    let raw = std::fs::read(fixture("free_proxy_list.html")).unwrap();
    let parser = ListingParser::new();
    assert_eq!(parser.parse(&raw).unwrap(), parser.parse(&raw).unwrap());
}

#[tokio::test]
async fn pipeline_keeps_only_listening_proxies() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let (_reserved, closed) = closed_port();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listing.html");
    std::fs::write(
        &path,
        listing(&[
            (open, "US", "United States"),
            (closed, "US", "United States"),
            (open, "DE", "Germany"),
        ]),
    )
    .unwrap();

    let validator = Validator::with_config(
        ValidatorConfig::new()
            .with_concurrency(2)
            .with_timeout(Duration::from_secs(2)),
    );
    let discovery = Discovery::new(ListingParser::new(), validator);

    let live = discovery
        .run(&FileSource::new(&path), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(live.len(), 2);
    assert_eq!(live.probed(), 3);
    assert!(live.iter().all(|proxy| proxy.port == open));

    let us_only = discovery.with_countries(vec!["us".to_string()]);
    let live = us_only
        .run(&FileSource::new(&path), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live.iter().next().unwrap().country_name, "United States");

    let saved = dir.path().join("live.txt");
    live.save_to_file(&saved).unwrap();
    assert_eq!(
        std::fs::read_to_string(&saved).unwrap(),
        format!("127.0.0.1:{}", open)
    );
}

#[tokio::test]
async fn unparsable_listing_halts_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocked.html");
    std::fs::write(&path, "<html><body>Access denied</body></html>").unwrap();

    let err = Discovery::default()
        .run(&FileSource::new(&path), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParseError>(),
        Some(ParseError::TableNotFound { .. })
    ));
}

#[tokio::test]
async fn listing_without_reachable_proxies_is_empty_not_error() {
    let (_reserved, closed) = closed_port();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listing.html");
    std::fs::write(&path, listing(&[(closed, "US", "United States")])).unwrap();

    let live = Discovery::default()
        .run(&FileSource::new(&path), CancellationToken::new())
        .await
        .unwrap();
    assert!(live.is_empty());
    assert_eq!(live.probed(), 1);
}
