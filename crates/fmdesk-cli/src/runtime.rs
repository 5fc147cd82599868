// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use fmdesk_api::Client;
use fmdesk_app::{
    Applied, DEFAULT_SEARCH_DEBOUNCE, EntityId, EntityRow, FilePart, FormPayload,
    ListController, MutationRequest, Payload, QueryState, ResourceKind, ToastLevel,
    render_window,
};
use serde_json::Value;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use time::macros::format_description;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationInput<'a> {
    pub data: &'a str,
    pub attach: Option<&'a Path>,
    pub patch: bool,
}

pub struct ConsoleRuntime<'a> {
    client: &'a Client,
    page_size: i64,
    search_debounce: Duration,
}

enum BrowseStep {
    Continue,
    Quit,
}

impl<'a> ConsoleRuntime<'a> {
    pub fn new(client: &'a Client, page_size: i64) -> Self {
        Self {
            client,
            page_size,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce = delay;
        self
    }

    fn controller(&self, kind: ResourceKind) -> Result<ListController<&'a Client>> {
        let query = QueryState::with_page_size(self.page_size)?;
        Ok(ListController::new(self.client, kind, query))
    }

    pub fn list(
        &self,
        kind: ResourceKind,
        options: &ListOptions,
        out: &mut dyn Write,
    ) -> Result<()> {
        let page_size = options.per_page.unwrap_or(self.page_size);
        let mut query = QueryState::with_page_size(page_size)?;
        if let Some(search) = &options.search {
            query.set_search(search);
        }
        for (key, value) in &options.filters {
            query.set_filter(key, value);
        }
        if let Some(page) = options.page {
            query.set_page(page);
        }
        let mut controller = ListController::new(self.client, kind, query);
        controller.refresh()?;

        if options.json {
            let body = serde_json::to_string_pretty(controller.items())?;
            writeln!(out, "{body}")?;
            return Ok(());
        }
        write_page(out, kind, &controller)
    }

    /// Interactive paging over one resource. Each input line is either a
    /// `:` command or the full search text; search text is fetched once
    /// typing has paused for the configured debounce.
    pub fn browse<R>(&self, kind: ResourceKind, input: R, out: &mut dyn Write) -> Result<()>
    where
        R: BufRead + Send + 'static,
    {
        let (lines_tx, lines_rx) = mpsc::channel();
        thread::spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if lines_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "stopped reading browse input");
                        break;
                    }
                }
            }
        });

        let mut controller = self
            .controller(kind)?
            .with_search_debounce(self.search_debounce);
        controller.refresh()?;
        write_page(out, kind, &controller)?;
        info!(resource = kind.as_str(), delay = ?self.search_debounce, "browsing");

        loop {
            let received = match controller.search_deadline() {
                Some(deadline) => {
                    lines_rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => lines_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(line) => match browse_line(&mut controller, &line) {
                    Ok((BrowseStep::Quit, _)) => break,
                    Ok((BrowseStep::Continue, applied)) => {
                        if applied.is_some() {
                            write_page(out, kind, &controller)?;
                        }
                    }
                    Err(error) => writeln!(out, "error: {error:#}")?,
                },
                Err(RecvTimeoutError::Timeout) => {
                    match controller.settle_search(Instant::now()) {
                        Ok(Some(_)) => write_page(out, kind, &controller)?,
                        Ok(None) => {}
                        Err(error) => writeln!(out, "error: {error}")?,
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    match controller.flush_search() {
                        Ok(Some(_)) => write_page(out, kind, &controller)?,
                        Ok(None) => {}
                        Err(error) => writeln!(out, "error: {error}")?,
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    pub fn show(&self, kind: ResourceKind, id: i64, out: &mut dyn Write) -> Result<()> {
        let controller = self.controller(kind)?;
        let record = controller.get(EntityId::new(id))?;
        writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        Ok(())
    }

    pub fn create(
        &self,
        kind: ResourceKind,
        input: &MutationInput<'_>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let request = build_request(kind, None, input)?;
        self.submit(kind, request, out)
    }

    pub fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        input: &MutationInput<'_>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let request = build_request(kind, Some(EntityId::new(id)), input)?;
        self.submit(kind, request, out)
    }

    fn submit(
        &self,
        kind: ResourceKind,
        request: MutationRequest,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut controller = self.controller(kind)?;
        let result = controller.submit(request);
        write_toast(out, &controller)?;
        let outcome = result?;
        if let Some(id) = outcome.body.get("id").and_then(Value::as_i64) {
            debug!(resource = kind.as_str(), id, "backend returned record id");
        }
        Ok(())
    }

    /// Deletes every id; failures are reported per id and fail the command at the end.
    pub fn delete(&self, kind: ResourceKind, ids: &[i64], out: &mut dyn Write) -> Result<()> {
        if ids.is_empty() {
            bail!("no ids given -- pass at least one record id to delete");
        }
        let mut controller = self.controller(kind)?;
        for id in ids {
            controller.selection_mut().insert(EntityId::new(*id));
        }

        let outcomes = controller.delete_selected()?;
        let mut failures = 0usize;
        for (id, result) in &outcomes {
            match result {
                Ok(_) => writeln!(out, "deleted {} {id}", kind.label())?,
                Err(error) => {
                    failures += 1;
                    warn!(resource = kind.as_str(), id = id.get(), %error, "delete failed");
                    writeln!(out, "failed {} {id}: {}", kind.label(), error.user_message())?;
                }
            }
        }

        if failures > 0 {
            bail!("{failures} of {} deletes failed", outcomes.len());
        }
        info!(resource = kind.as_str(), count = outcomes.len(), "bulk delete finished");
        Ok(())
    }
}

pub fn print_resources(out: &mut dyn Write) -> Result<()> {
    for kind in ResourceKind::ALL {
        let endpoint = kind.endpoint();
        let filters: Vec<&str> = endpoint.filter_keys().collect();
        let filters = if filters.is_empty() {
            "-".to_owned()
        } else {
            filters.join(",")
        };
        let marker = if kind.path_is_assumed() { " (assumed)" } else { "" };
        writeln!(
            out,
            "{:<18} {:<44} filters: {}{}",
            kind.as_str(),
            endpoint.collection_path,
            filters,
            marker
        )?;
    }
    Ok(())
}

pub fn parse_resource(raw: &str) -> Result<ResourceKind> {
    ResourceKind::parse(raw).ok_or_else(|| {
        anyhow!("unknown resource {raw:?} -- run `fmdesk resources` to list the valid names")
    })
}

/// `key=value`; the value may itself contain `=`.
pub fn parse_filter(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("filter {raw:?} must look like key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("filter {raw:?} has an empty key");
    }
    Ok((key.to_owned(), value.trim().to_owned()))
}

fn build_request(
    kind: ResourceKind,
    id: Option<EntityId>,
    input: &MutationInput<'_>,
) -> Result<MutationRequest> {
    let value: Value = serde_json::from_str(input.data).context("--data must be a JSON object")?;
    if !value.is_object() {
        bail!("--data must be a JSON object, got {value}");
    }

    if input.patch {
        let id = id.ok_or_else(|| anyhow!("--patch needs a record id"))?;
        if input.attach.is_some() {
            bail!("--attach cannot be combined with --patch -- send a full update instead");
        }
        return Ok(MutationRequest::patch(id, Payload::Json(value)));
    }

    match FormPayload::from_json(kind, value.clone())? {
        Some(mut form) => {
            if let Some(path) = input.attach {
                form.attach(read_attachment(kind, path)?)?;
            }
            Ok(form.to_request(id)?)
        }
        None => {
            if input.attach.is_some() {
                bail!("{} records do not take attachments", kind.label());
            }
            let payload = Payload::Json(value);
            Ok(match id {
                Some(id) => MutationRequest::update(id, payload),
                None => MutationRequest::create(payload),
            })
        }
    }
}

fn read_attachment(kind: ResourceKind, path: &Path) -> Result<FilePart> {
    let data = fs::read(path).with_context(|| format!("read attachment {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("attachment path {} has no file name", path.display()))?
        .to_owned();
    let field = match kind {
        ResourceKind::Banners => "banner_image",
        _ => "logo",
    };
    Ok(FilePart {
        field: field.to_owned(),
        mime_type: mime_type_for(path).to_owned(),
        file_name,
        data,
    })
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn browse_line(
    controller: &mut ListController<&Client>,
    line: &str,
) -> Result<(BrowseStep, Option<Applied>)> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix(':') else {
        controller.type_search(trimmed, Instant::now());
        return Ok((BrowseStep::Continue, None));
    };

    let mut parts = command.split_whitespace();
    let applied = match (parts.next(), parts.next()) {
        (Some("q" | "quit"), None) => return Ok((BrowseStep::Quit, None)),
        (Some("next"), None) => {
            let next = controller
                .pagination()
                .clamp_page(controller.query().page.saturating_add(1));
            controller.set_page(next)?
        }
        (Some("prev"), None) => {
            let previous = controller.query().page.saturating_sub(1).max(1);
            controller.set_page(previous)?
        }
        (Some("page"), Some(raw)) => {
            let page: i64 = raw
                .parse()
                .with_context(|| format!("page number {raw:?}"))?;
            controller.set_page(page)?
        }
        _ => bail!("unknown command :{command}; try :next, :prev, :page N or :quit"),
    };
    Ok((BrowseStep::Continue, Some(applied)))
}

fn write_page(
    out: &mut dyn Write,
    kind: ResourceKind,
    controller: &ListController<&Client>,
) -> Result<()> {
    write_table(out, controller.items())?;
    let pagination = controller.pagination();
    let current = pagination.clamp_page(controller.query().page);
    writeln!(
        out,
        "{} {} of {} ({} total)",
        kind.label(),
        current,
        pagination.total_pages,
        pagination.total_count
    )?;
    if pagination.total_pages > 1 {
        writeln!(out, "{}", render_window(&controller.window(), current))?;
    }
    Ok(())
}

fn write_table(out: &mut dyn Write, items: &[Value]) -> Result<()> {
    if items.is_empty() {
        writeln!(out, "no records")?;
        return Ok(());
    }

    let created_format = format_description!("[year]-[month]-[day]");
    writeln!(out, "{:>8}  {:<40}  {:<12}  {}", "ID", "NAME", "STATUS", "CREATED")?;
    for item in items {
        let row = EntityRow::from_value(item);
        let id = row.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_owned());
        let created = row
            .created_at
            .and_then(|at| at.format(&created_format).ok())
            .unwrap_or_default();
        writeln!(
            out,
            "{:>8}  {:<40}  {:<12}  {}",
            id,
            truncate(&row.label, 40),
            row.status.unwrap_or_default(),
            created
        )?;
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn write_toast(out: &mut dyn Write, controller: &ListController<&Client>) -> Result<()> {
    if let Some(toast) = &controller.mutation_state().toast {
        match toast.level {
            ToastLevel::Success => {
                writeln!(out, "ok: {} {}", controller.kind().label(), toast.message)?
            }
            ToastLevel::Error => writeln!(out, "error: {}", toast.message)?,
        }
    }
    Ok(())
}
