use super::logger::display_addr;
use super::*;
use crate::http::BodyError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

fn ctx() -> RequestContext {
    RequestContext::new(CancellationSignal::new())
}

fn text(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn lines(bytes: &Bytes) -> Vec<String> {
    text(bytes).lines().map(str::to_owned).collect()
}

#[test]
fn test_render_json_post() {
    let request = Request::post("/?first=value")
        .header("content-type", "application/json")
        .body(())
        .unwrap();
    let (parts, ()) = request.into_parts();

    let echo = render_echo(&parts, Ok(Bytes::from_static(br#"{"somejson":"value"}"#)));

    assert_eq!(
        lines(&echo),
        vec![
            "Received request: ",
            "Header: Content-Type, Value: application/json",
            "Method: POST",
            "Query param: first, Value: value",
            r#"Request body: {"somejson":"value"}"#,
        ]
    );
}

#[test]
fn test_render_every_value_of_repeated_keys() {
    let request = Request::get("/?tag=a&other=1&tag=b&tag=c")
        .header("x-trace", "one")
        .header("x-trace", "two")
        .body(())
        .unwrap();
    let (parts, ()) = request.into_parts();

    let echo = lines(&render_echo(&parts, Ok(Bytes::new())));

    let tags: Vec<_> = echo.iter().filter(|l| l.starts_with("Query param: tag,")).collect();
    assert_eq!(
        tags,
        vec![
            "Query param: tag, Value: a",
            "Query param: tag, Value: b",
            "Query param: tag, Value: c",
        ]
    );
    assert!(echo.contains(&"Query param: other, Value: 1".to_string()));

    let traces: Vec<_> = echo.iter().filter(|l| l.starts_with("Header: X-Trace,")).collect();
    assert_eq!(
        traces,
        vec!["Header: X-Trace, Value: one", "Header: X-Trace, Value: two"]
    );
}

#[test]
fn test_render_decodes_query() {
    let (parts, ()) = Request::get("/?greeting=hello+world&path=%2Ftmp&flag")
        .body(())
        .unwrap()
        .into_parts();

    let echo = text(&render_echo(&parts, Ok(Bytes::new())));

    assert!(echo.contains("Query param: greeting, Value: hello world\n"));
    assert!(echo.contains("Query param: path, Value: /tmp\n"));
    assert!(echo.contains("Query param: flag, Value: \n"));
}

#[test]
fn test_render_body_failure_replaces_body_line() {
    let (parts, ()) = Request::put("/").body(()).unwrap().into_parts();

    let echo = text(&render_echo(&parts, Err(BodyError::UnexpectedEof)));

    assert!(echo.contains("Method: PUT\n"));
    assert!(echo.contains("Failed to read request body: unexpected EOF\n"));
    assert!(!echo.contains("Request body:"));
}

#[test]
fn test_render_body_bytes_verbatim() {
    let (parts, ()) = Request::post("/").body(()).unwrap().into_parts();
    let body = Bytes::from_static(b"\xff\x00raw\r\n");

    let echo = render_echo(&parts, Ok(body));

    assert!(echo.ends_with(b"Request body: \xff\x00raw\r\n\n"));
}

#[test]
fn test_canonical_header_name() {
    assert_eq!(canonical_header_name("content-type"), "Content-Type");
    assert_eq!(canonical_header_name("x-forwarded-for"), "X-Forwarded-For");
    assert_eq!(canonical_header_name("accept"), "Accept");
    assert_eq!(canonical_header_name("www-authenticate"), "Www-Authenticate");
}

#[tokio::test(start_paused = true)]
async fn test_echo_handler_waits_for_delay() {
    let handler = EchoHandler::new();
    let request = Request::post("/").body(Body::from("ping")).unwrap();

    let start = tokio::time::Instant::now();
    let response = handler.call(ctx(), request).await;

    assert!(start.elapsed() >= ECHO_DELAY);
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert!(text(response.body()).contains("Request body: ping\n"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_echoes_share_one_delay() {
    let handler = Arc::new(EchoHandler::new());
    let start = tokio::time::Instant::now();

    let calls = (0..10).map(|i| {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let request = Request::get(format!("/?n={i}")).body(Body::Empty).unwrap();
            handler.call(ctx(), request).await
        })
    });
    for call in calls.collect::<Vec<_>>() {
        call.await.unwrap();
    }

    assert!(start.elapsed() < ECHO_DELAY * 2);
}

/// Records the context it was called with
struct Recorder {
    seen: Mutex<Vec<Option<SocketAddr>>>,
}

#[async_trait]
impl Handler for Recorder {
    async fn call(&self, ctx: RequestContext, _request: Request<Body>) -> Response<Bytes> {
        self.seen.lock().unwrap().push(ctx.server_addr);
        Response::new(Bytes::from_static(b"recorded"))
    }
}

#[tokio::test]
async fn test_logger_delegates_with_context() {
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    let logger = Logger::new(Arc::clone(&recorder));
    let addr: SocketAddr = "127.0.0.1:3333".parse().unwrap();

    let response = logger
        .call(ctx().with_server_addr(addr), Request::new(Body::Empty))
        .await;
    // Missing listener identity is logged, not rejected
    logger.call(ctx(), Request::new(Body::Empty)).await;

    assert_eq!(response.body().as_ref(), b"recorded");
    assert_eq!(*recorder.seen.lock().unwrap(), vec![Some(addr), None]);
}

#[test]
fn test_logged_addresses_are_bare() {
    let addr: SocketAddr = "127.0.0.1:3333".parse().unwrap();
    assert_eq!(display_addr(Some(addr)), "127.0.0.1:3333");
    assert_eq!(display_addr(None), "");

    let v6: SocketAddr = "[::1]:4444".parse().unwrap();
    assert_eq!(display_addr(Some(v6)), "[::1]:4444");
}

#[tokio::test]
async fn test_shared_chain_is_object_safe() {
    let chain: SharedHandler = Arc::new(Logger::new(EchoHandler::with_delay(Duration::ZERO)));

    let request = Request::delete("/items?id=7").body(Body::Empty).unwrap();
    let response = chain.call(ctx(), request).await;
    let echo = text(response.body());

    assert!(echo.contains("Method: DELETE\n"));
    assert!(echo.contains("Query param: id, Value: 7\n"));
    assert!(echo.contains("Request body: \n"));
}
