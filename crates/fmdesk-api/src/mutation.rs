// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use fmdesk_app::{
    ConsoleError, ConsoleResult, EndpointDescriptor, EntityId, MultipartForm, MutationKind,
    MutationOutcome, MutationRequest, Payload, ResourceKind, SelectionSet,
};
use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};
use serde_json::{Map, Value};
use tracing::{debug, trace_span};

use crate::{Client, envelope};

impl Client {
    /// Exactly one request for `request`; nothing is retried.
    pub fn perform(
        &self,
        kind: ResourceKind,
        request: &MutationRequest,
    ) -> ConsoleResult<MutationOutcome> {
        let _span = trace_span!(
            "mutate",
            resource = kind.as_str(),
            method = request.kind.method()
        )
        .entered();
        let endpoint = kind.endpoint();
        let path = target_path(&endpoint, request)?;
        let url = self.context.url(&path)?;

        let builder = self.http.request(method(request.kind), url.clone());
        let builder = match &request.payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.json(&wrap_json(endpoint.wrapper_key, body)),
            Payload::Multipart(form) => builder.multipart(multipart(endpoint.wrapper_key, form)?),
        };

        let fallback = format!("{} {} failed", kind.label(), verb(request.kind));
        let (status, body) = self.send(request.kind.method(), url.as_str(), builder, &fallback)?;
        envelope::check_application(&body)?;

        debug!(
            resource = kind.as_str(),
            id = ?request.id,
            status,
            "{} {}",
            kind.label(),
            request.kind.past_tense()
        );
        Ok(MutationOutcome {
            kind: request.kind,
            status,
            body,
        })
    }

    /// Like `perform`, then runs `on_success` (usually a list refresh) if the request succeeded.
    pub fn perform_then<F>(
        &self,
        kind: ResourceKind,
        request: &MutationRequest,
        on_success: F,
    ) -> ConsoleResult<MutationOutcome>
    where
        F: FnOnce(&MutationOutcome),
    {
        let outcome = self.perform(kind, request)?;
        on_success(&outcome);
        Ok(outcome)
    }

    /// One DELETE per selected id in ascending order. Failures do not stop the batch.
    pub fn delete_many(
        &self,
        kind: ResourceKind,
        selection: &SelectionSet,
    ) -> Vec<(EntityId, ConsoleResult<MutationOutcome>)> {
        selection
            .iter()
            .map(|id| (id, self.perform(kind, &MutationRequest::delete(id))))
            .collect()
    }
}

fn method(kind: MutationKind) -> Method {
    match kind {
        MutationKind::Create => Method::POST,
        MutationKind::Update => Method::PUT,
        MutationKind::Patch => Method::PATCH,
        MutationKind::Delete => Method::DELETE,
    }
}

fn verb(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Create => "create",
        MutationKind::Update | MutationKind::Patch => "update",
        MutationKind::Delete => "delete",
    }
}

fn target_path(endpoint: &EndpointDescriptor, request: &MutationRequest) -> ConsoleResult<String> {
    match (request.kind, request.id) {
        (MutationKind::Create, None) => Ok(format!("{}.json", endpoint.member_base)),
        (MutationKind::Create, Some(id)) => Err(ConsoleError::validation(format!(
            "create does not take a record id (got {id}) -- use update instead"
        ))),
        (_, Some(id)) => Ok(endpoint.member_path(id)),
        (kind, None) => Err(ConsoleError::validation(format!(
            "{} needs a record id -- pass the id and retry",
            verb(kind)
        ))),
    }
}

pub(crate) fn wrap_json(wrapper_key: Option<&str>, body: &Value) -> Value {
    match wrapper_key {
        Some(key) => {
            let mut wrapped = Map::new();
            wrapped.insert(key.to_owned(), body.clone());
            Value::Object(wrapped)
        }
        None => body.clone(),
    }
}

pub(crate) fn form_field_name(wrapper_key: Option<&str>, field: &str) -> String {
    match wrapper_key {
        Some(key) => format!("{key}[{field}]"),
        None => field.to_owned(),
    }
}

fn multipart(wrapper_key: Option<&str>, form: &MultipartForm) -> ConsoleResult<Form> {
    let mut multipart = Form::new();
    for (field, value) in &form.fields {
        multipart = multipart.text(form_field_name(wrapper_key, field), value.clone());
    }
    for file in &form.files {
        let part = Part::bytes(file.data.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|error| {
                ConsoleError::validation(format!(
                    "attachment {:?} has an invalid MIME type {:?}: {error}",
                    file.file_name, file.mime_type
                ))
            })?;
        multipart = multipart.part(form_field_name(wrapper_key, &file.field), part);
    }
    Ok(multipart)
}
