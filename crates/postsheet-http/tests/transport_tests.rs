// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use postsheet_app::{RowField, RowStore};
use postsheet_http::{DispatchConfig, Dispatcher, HttpTransport, Transport};
use serde_json::{Value, json};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

#[derive(Debug)]
struct Captured {
    url: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Value,
}

fn header(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.to_string().eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str().to_owned())
}

fn serve(
    server: Server,
    count: usize,
    status: u16,
    reply: &'static str,
) -> thread::JoinHandle<Vec<Captured>> {
    thread::spawn(move || {
        let mut captured = Vec::with_capacity(count);
        for _ in 0..count {
            let mut request = server.recv().expect("request expected");
            assert_eq!(*request.method(), Method::Post);
            let mut raw = String::new();
            request
                .as_reader()
                .read_to_string(&mut raw)
                .expect("body should be readable");
            captured.push(Captured {
                url: request.url().to_owned(),
                authorization: header(&request, "Authorization"),
                content_type: header(&request, "Content-Type"),
                body: serde_json::from_str(&raw).expect("body should be JSON"),
            });
            let response = Response::from_string(reply)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes("Content-Type", "text/plain")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
        }
        captured
    })
}

#[test]
fn post_json_sends_bearer_token_and_json_body() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/post", server.server_addr());
    let handle = serve(server, 1, 200, "queued");

    let transport = HttpTransport::new(Some(Duration::from_secs(2)))?;
    let delivery = transport.post_json(&url, "abc123", &json!({"content": "hi"}))?;
    assert_eq!(delivery.status, 200);
    assert_eq!(delivery.body, "queued");

    let captured = handle.join().expect("server thread should join");
    assert_eq!(captured[0].url, "/post");
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer abc123"));
    assert_eq!(captured[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(captured[0].body, json!({"content": "hi"}));
    Ok(())
}

#[test]
fn non_success_status_is_a_request_failure() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/post", server.server_addr());
    let handle = serve(server, 1, 401, "invalid token");

    let transport = HttpTransport::new(Some(Duration::from_secs(2)))?;
    let error = transport
        .post_json(&url, "wrong", &json!({"content": "hi"}))
        .expect_err("401 should fail");
    assert_eq!(error.to_string(), "server error (401): invalid token");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn unreachable_endpoint_error_names_the_config_key() -> Result<()> {
    let transport = HttpTransport::new(Some(Duration::from_millis(200)))?;
    let error = transport
        .post_json("http://127.0.0.1:1/post", "t", &json!({"content": "hi"}))
        .expect_err("closed port should fail");
    let message = error.to_string();
    assert!(
        message.contains("[http].endpoint") || message.contains("[http].timeout"),
        "unexpected message: {message}"
    );
    Ok(())
}

#[test]
fn dispatcher_posts_rows_and_replies_over_http() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let endpoint = format!("http://{}/post", server.server_addr());
    let handle = serve(server, 4, 200, "ok");

    let mut store = RowStore::new();
    let id = store.add_row();
    store.update_field(id, RowField::Account, "acme");
    store.update_field(id, RowField::BusinessAccount, "acme-biz");
    store.update_field(id, RowField::ContentA, "please reply");
    store.update_field(id, RowField::ContentC, "closing post");

    let dispatcher = Dispatcher::new(
        DispatchConfig::new(&endpoint, "static-token")?,
        HttpTransport::new(Some(Duration::from_secs(2)))?,
    );
    let posted = dispatcher.post_all(store.rows())?;
    assert_eq!(posted.delivered(), 3);
    let replied = dispatcher.auto_reply_scan(store.rows())?;
    assert_eq!(replied.delivered(), 1);

    let captured = handle.join().expect("server thread should join");
    let posts: Vec<&Captured> = captured.iter().filter(|c| c.url == "/post").collect();
    let replies: Vec<&Captured> = captured.iter().filter(|c| c.url == "/post/reply").collect();
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().any(|c| c.body["content"] == ""));
    assert_eq!(replies.len(), 1);
    assert!(posts.iter().all(|c| c.body["businessAccount"] == "acme-biz"));
    assert_eq!(
        replies[0].body,
        json!({"content": "Thank you for your reply!"})
    );
    assert!(
        captured
            .iter()
            .all(|c| c.authorization.as_deref() == Some("Bearer static-token"))
    );
    Ok(())
}
