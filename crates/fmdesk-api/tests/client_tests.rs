// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use fmdesk_api::{ApiContext, Client};
use fmdesk_app::{
    Applied, ConsoleError, EntityId, FilePart, ListController, MultipartForm, MutationKind,
    MutationRequest, PageSlot, Payload, QueryState, ResourceKind, SelectionSet,
};
use fmdesk_testkit::{ConsoleFaker, MockServer, ScriptedResponse, list_body};
use serde_json::{Value, json};
use std::cell::Cell;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

fn client(base_url: &str) -> Result<Client> {
    let context = ApiContext::new(base_url, "secret-token")?;
    Ok(Client::new(context, Duration::from_secs(2))?)
}

#[test]
fn unreachable_backend_is_a_transport_error() -> Result<()> {
    let context = ApiContext::new("http://127.0.0.1:1", "token")?;
    let client = Client::new(context, Duration::from_millis(50))?;

    let error = client
        .fetch::<Value>(ResourceKind::Companies, &QueryState::default())
        .expect_err("fetch should fail for unreachable endpoint");
    assert!(matches!(error, ConsoleError::Transport { .. }));
    assert!(error.to_string().contains("base_url"));
    Ok(())
}

#[test]
fn missing_token_fails_without_a_request() -> Result<()> {
    let context = ApiContext::new("http://127.0.0.1:1", "")?;
    let client = Client::new(context, Duration::from_millis(50))?;

    let error = client
        .fetch::<Value>(ResourceKind::Banners, &QueryState::default())
        .expect_err("empty token should be rejected");
    assert_eq!(error, ConsoleError::MissingToken);
    Ok(())
}

/// Answers one request with a 200 whose body stops short of its Content-Length.
fn truncated_success_server() -> Result<(String, thread::JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let handle = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = [0_u8; 4096];
        let _ = stream.read(&mut request);
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n{\"companies\": [",
        );
        let _ = stream.flush();
    });
    Ok((base_url, handle))
}

#[test]
fn truncated_list_body_is_a_transport_error() -> Result<()> {
    let (base_url, handle) = truncated_success_server()?;
    let client = client(&base_url)?;

    let error = client
        .fetch::<Value>(ResourceKind::Companies, &QueryState::default())
        .expect_err("cut-off body should fail");
    assert!(matches!(error, ConsoleError::Transport { .. }), "{error:?}");
    handle.join().ok();
    Ok(())
}

#[test]
fn truncated_mutation_body_is_not_reported_as_success() -> Result<()> {
    let (base_url, handle) = truncated_success_server()?;
    let client = client(&base_url)?;

    let request = MutationRequest::create(Payload::Json(json!({"name": "Harbor"})));
    let error = client
        .perform(ResourceKind::Companies, &request)
        .expect_err("cut-off body should fail");
    assert!(matches!(error, ConsoleError::Transport { .. }), "{error:?}");
    handle.join().ok();
    Ok(())
}

#[test]
fn fetch_sends_query_and_bearer_token() -> Result<()> {
    let mut faker = ConsoleFaker::new(5);
    let rows = faker.records(ResourceKind::Companies, 10);
    let server = MockServer::start(vec![ScriptedResponse::json(
        200,
        &list_body(ResourceKind::Companies, &rows, 2, 10, 95),
    )])?;
    let client = client(server.base_url())?;

    let mut query = QueryState::default();
    query.set_search("Harbor");
    query.set_filter("organization_id", "4");
    query.set_page(2);
    let page = client.fetch::<Value>(ResourceKind::Companies, &query)?;

    assert_eq!(page.items.len(), 10);
    let pagination = page.pagination.expect("pagination should be present");
    assert_eq!(pagination.total_pages, 10);
    assert_eq!(pagination.current_page, 2);

    let requests = server.finish()?;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.path(), "/pms/company_setups/company_index.json");
    assert_eq!(request.header("Authorization"), Some("Bearer secret-token"));
    assert_eq!(
        request.query(),
        vec![
            ("page".to_owned(), "2".to_owned()),
            ("per_page".to_owned(), "10".to_owned()),
            ("q[name_cont]".to_owned(), "Harbor".to_owned()),
            ("q[organization_id_eq]".to_owned(), "4".to_owned()),
        ]
    );
    assert!(request.url.contains("q%5Bname_cont%5D=Harbor"));
    Ok(())
}

#[test]
fn empty_search_is_omitted() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(200, &json!([]))])?;
    let client = client(server.base_url())?;

    let mut query = QueryState::default();
    query.set_search("   ");
    let page = client.fetch::<Value>(ResourceKind::Folders, &query)?;
    assert!(page.items.is_empty());
    assert_eq!(page.pagination, None);

    let requests = server.finish()?;
    let keys: Vec<String> = requests[0].query().into_iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["page".to_owned(), "per_page".to_owned()]);
    Ok(())
}

#[test]
fn error_status_carries_backend_message() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(
        401,
        &json!({"error": "Invalid token"}),
    )])?;
    let client = client(server.base_url())?;

    let error = client
        .fetch::<Value>(ResourceKind::Notices, &QueryState::default())
        .expect_err("401 should fail");
    assert_eq!(
        error,
        ConsoleError::Request {
            status: 401,
            message: "Invalid token".to_owned()
        }
    );
    server.finish()?;
    Ok(())
}

#[test]
fn application_code_inside_200_is_an_error() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(
        200,
        &json!({"code": 500, "message": "Site not configured", "data": []}),
    )])?;
    let client = client(server.base_url())?;

    let error = client
        .fetch::<Value>(ResourceKind::EvConsumptions, &QueryState::default())
        .expect_err("code 500 should fail");
    assert!(matches!(error, ConsoleError::Application { code: 500, .. }));
    assert_eq!(error.user_message(), "Site not configured");
    server.finish()?;
    Ok(())
}

#[test]
fn unexpected_shape_is_reported() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(
        200,
        &json!({"companies": "none"}),
    )])?;
    let client = client(server.base_url())?;

    let error = client
        .fetch::<Value>(ResourceKind::Companies, &QueryState::default())
        .expect_err("string is not a list");
    assert!(matches!(error, ConsoleError::Shape { .. }));
    server.finish()?;
    Ok(())
}

#[test]
fn fetch_one_unwraps_model_key() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(
        200,
        &json!({"banner": {"id": 14, "title": "Pool reopening"}}),
    )])?;
    let client = client(server.base_url())?;

    let record = client.fetch_one(ResourceKind::Banners, EntityId::new(14))?;
    assert_eq!(record["title"], json!("Pool reopening"));

    let requests = server.finish()?;
    assert_eq!(requests[0].path(), "/pms/banners/14.json");
    Ok(())
}

#[test]
fn create_posts_wrapped_json_and_runs_callback() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(
        201,
        &json!({"id": 31, "name": "Harbor Facilities"}),
    )])?;
    let client = client(server.base_url())?;

    let refreshed = Cell::new(false);
    let request = MutationRequest::create(Payload::Json(json!({"name": "Harbor Facilities"})));
    let outcome = client.perform_then(ResourceKind::Companies, &request, |_| {
        refreshed.set(true);
    })?;
    assert_eq!(outcome.kind, MutationKind::Create);
    assert_eq!(outcome.status, 201);
    assert!(refreshed.get());

    let requests = server.finish()?;
    let recorded = &requests[0];
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path(), "/pms/company_setups.json");
    assert_eq!(
        recorded.body_json()?,
        json!({"pms_company_setup": {"name": "Harbor Facilities"}})
    );
    Ok(())
}

#[test]
fn failed_mutation_skips_callback_and_uses_backend_errors() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(
        422,
        &json!({"errors": {"title": ["can't be blank"]}}),
    )])?;
    let client = client(server.base_url())?;

    let refreshed = Cell::new(false);
    let request = MutationRequest::update(EntityId::new(3), Payload::Json(json!({"title": ""})));
    let error = client
        .perform_then(ResourceKind::Banners, &request, |_| refreshed.set(true))
        .expect_err("422 should fail");
    assert_eq!(error.user_message(), "title can't be blank");
    assert!(!refreshed.get());

    let requests = server.finish()?;
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path(), "/pms/banners/3.json");
    Ok(())
}

#[test]
fn failed_mutation_without_message_uses_generic_text() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::text(500, "")])?;
    let client = client(server.base_url())?;

    let error = client
        .perform(ResourceKind::Notices, &MutationRequest::delete(EntityId::new(8)))
        .expect_err("500 should fail");
    assert_eq!(error.user_message(), "notice delete failed");
    server.finish()?;
    Ok(())
}

#[test]
fn multipart_payload_uses_bracketed_field_names() -> Result<()> {
    let server = MockServer::start(vec![ScriptedResponse::json(200, &json!({"id": 2}))])?;
    let client = client(server.base_url())?;

    let form = MultipartForm {
        fields: vec![("title".to_owned(), "Summer fair".to_owned())],
        files: vec![FilePart {
            field: "banner_image".to_owned(),
            file_name: "fair.png".to_owned(),
            mime_type: "image/png".to_owned(),
            data: b"not-really-a-png".to_vec(),
        }],
    };
    let request = MutationRequest::patch(EntityId::new(2), Payload::Multipart(form));
    client.perform(ResourceKind::Banners, &request)?;

    let requests = server.finish()?;
    let recorded = &requests[0];
    assert_eq!(recorded.method, "PATCH");
    assert!(
        recorded
            .header("Content-Type")
            .is_some_and(|value| value.starts_with("multipart/form-data"))
    );
    let body = recorded.body_text();
    assert!(body.contains(r#"name="banner[title]""#));
    assert!(body.contains("Summer fair"));
    assert!(body.contains(r#"name="banner[banner_image]"; filename="fair.png""#));
    Ok(())
}

#[test]
fn delete_many_goes_in_ascending_order_and_reports_each_id() -> Result<()> {
    let server = MockServer::start(vec![
        ScriptedResponse::json(200, &json!({})),
        ScriptedResponse::json(422, &json!({"message": "Folder is not empty"})),
        ScriptedResponse::text(204, ""),
    ])?;
    let client = client(server.base_url())?;

    let selection: SelectionSet = [9, 2, 5].into_iter().map(EntityId::new).collect();
    let outcomes = client.delete_many(ResourceKind::Folders, &selection);

    let ids: Vec<i64> = outcomes.iter().map(|(id, _)| id.get()).collect();
    assert_eq!(ids, vec![2, 5, 9]);
    assert!(outcomes[0].1.is_ok());
    assert_eq!(
        outcomes[1]
            .1
            .as_ref()
            .map_err(ConsoleError::user_message)
            .err()
            .as_deref(),
        Some("Folder is not empty")
    );
    assert!(outcomes[2].1.is_ok());

    let paths: Vec<String> = server
        .finish()?
        .iter()
        .map(|request| format!("{} {}", request.method, request.path()))
        .collect();
    assert_eq!(
        paths,
        vec![
            "DELETE /folders/2.json",
            "DELETE /folders/5.json",
            "DELETE /folders/9.json"
        ]
    );
    Ok(())
}

#[test]
fn controller_drives_client_end_to_end() -> Result<()> {
    let mut faker = ConsoleFaker::new(21);
    let first_page = faker.records(ResourceKind::Projects, 10);
    let after_delete = faker.records(ResourceKind::Projects, 9);
    let server = MockServer::start(vec![
        ScriptedResponse::json(200, &list_body(ResourceKind::Projects, &first_page, 1, 10, 95)),
        ScriptedResponse::json(200, &json!({"code": 200})),
        ScriptedResponse::json(
            200,
            &list_body(ResourceKind::Projects, &after_delete, 1, 10, 94),
        ),
    ])?;
    let client = client(server.base_url())?;

    let mut controller =
        ListController::new(&client, ResourceKind::Projects, QueryState::default());
    assert_eq!(controller.refresh()?, Applied::Fresh);
    assert_eq!(
        controller.window(),
        vec![
            PageSlot::Page(1),
            PageSlot::Page(2),
            PageSlot::Page(3),
            PageSlot::Ellipsis,
            PageSlot::Page(10),
        ]
    );

    controller.submit(MutationRequest::delete(EntityId::new(4)))?;
    assert_eq!(controller.items().len(), 9);
    assert_eq!(controller.pagination().total_count, 94);

    let methods: Vec<String> = server
        .finish()?
        .into_iter()
        .map(|request| request.method)
        .collect();
    assert_eq!(methods, vec!["GET", "DELETE", "GET"]);
    Ok(())
}
