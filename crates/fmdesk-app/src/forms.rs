// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;
use serde_json::{Map, Value};
use time::Date;
use time::macros::format_description;

use crate::{
    ConsoleError, ConsoleResult, EntityId, FilePart, MultipartForm, MutationRequest,
    OrganizationId, Payload, ResourceKind, RoleId, SiteId,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyFormInput {
    pub name: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub country_id: Option<i64>,
    #[serde(default)]
    pub billing_term: String,
    #[serde(default)]
    pub billing_rate_cents: Option<i64>,
    #[serde(default, with = "iso_date::option")]
    pub live_date: Option<Date>,
    #[serde(default)]
    pub remarks: String,
    #[serde(skip)]
    pub logo: Option<FilePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BannerFormInput {
    pub title: String,
    pub site_id: SiteId,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    #[serde(skip)]
    pub image: Option<FilePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NoticeFormInput {
    pub heading: String,
    pub text: String,
    pub site_id: SiteId,
    #[serde(default)]
    pub notice_type: String,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default, with = "iso_date::option")]
    pub publish_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub expire_date: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvConsumptionFormInput {
    pub transaction_id: String,
    pub site_id: SiteId,
    pub energy_wh: i64,
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(with = "iso_date")]
    pub started_on: Date,
    #[serde(default, with = "iso_date::option")]
    pub ended_on: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminUserFormInput {
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    pub role_id: RoleId,
    #[serde(default = "enabled")]
    pub active: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Company(CompanyFormInput),
    Banner(BannerFormInput),
    Notice(NoticeFormInput),
    EvConsumption(EvConsumptionFormInput),
    AdminUser(AdminUserFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Company(_) => ResourceKind::Companies,
            Self::Banner(_) => ResourceKind::Banners,
            Self::Notice(_) => ResourceKind::Notices,
            Self::EvConsumption(_) => ResourceKind::EvConsumptions,
            Self::AdminUser(_) => ResourceKind::AdminUsers,
        }
    }

    /// Typed form for `kind`, or `None` when the resource has no form and takes raw JSON.
    pub fn from_json(kind: ResourceKind, value: Value) -> ConsoleResult<Option<Self>> {
        let parsed = match kind {
            ResourceKind::Companies => serde_json::from_value(value).map(Self::Company),
            ResourceKind::Banners => serde_json::from_value(value).map(Self::Banner),
            ResourceKind::Notices => serde_json::from_value(value).map(Self::Notice),
            ResourceKind::EvConsumptions => {
                serde_json::from_value(value).map(Self::EvConsumption)
            }
            ResourceKind::AdminUsers => serde_json::from_value(value).map(Self::AdminUser),
            _ => return Ok(None),
        };
        parsed.map(Some).map_err(|error| {
            ConsoleError::validation(format!(
                "invalid {} fields: {error} -- fix the JSON and retry",
                kind.label()
            ))
        })
    }

    pub fn validate(&self) -> ConsoleResult<()> {
        match self {
            Self::Company(company) => company.validate(),
            Self::Banner(banner) => banner.validate(),
            Self::Notice(notice) => notice.validate(),
            Self::EvConsumption(record) => record.validate(),
            Self::AdminUser(user) => user.validate(),
        }
    }

    /// Companies take a logo and banners an image; other forms have no file slot.
    pub fn attach(&mut self, file: FilePart) -> ConsoleResult<()> {
        match self {
            Self::Company(company) => company.logo = Some(file),
            Self::Banner(banner) => banner.image = Some(file),
            other => {
                return Err(ConsoleError::validation(format!(
                    "{} forms do not accept attachments",
                    other.kind().label()
                )));
            }
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ConsoleResult<Payload> {
        match self {
            Self::Company(company) => company.to_payload(),
            Self::Banner(banner) => banner.to_payload(),
            Self::Notice(notice) => notice.to_payload(),
            Self::EvConsumption(record) => record.to_payload(),
            Self::AdminUser(user) => Ok(user.to_payload()),
        }
    }

    /// Validated create (no id) or update request.
    pub fn to_request(&self, id: Option<EntityId>) -> ConsoleResult<MutationRequest> {
        self.validate()?;
        let payload = self.to_payload()?;
        Ok(match id {
            Some(id) => MutationRequest::update(id, payload),
            None => MutationRequest::create(payload),
        })
    }
}

impl CompanyFormInput {
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::validation(
                "company name is required -- enter a name and retry",
            ));
        }
        if self.organization_id.get() <= 0 {
            return Err(ConsoleError::validation(
                "company organization is required -- choose an organization and retry",
            ));
        }
        if let Some(rate) = self.billing_rate_cents
            && rate < 0
        {
            return Err(ConsoleError::validation("company billing rate cannot be negative"));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ConsoleResult<Payload> {
        let mut fields = Fields::default();
        fields.text("name", self.name.trim());
        fields.number("organization_id", self.organization_id.get());
        fields.optional_number("country_id", self.country_id);
        fields.text("billing_term", &self.billing_term);
        fields.optional_number("billing_rate_cents", self.billing_rate_cents);
        fields.date("live_date", self.live_date)?;
        fields.text("remarks", &self.remarks);
        Ok(fields.into_payload(self.logo.clone()))
    }
}

impl BannerFormInput {
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.title.trim().is_empty() {
            return Err(ConsoleError::validation(
                "banner title is required -- enter a title and retry",
            ));
        }
        if self.site_id.get() <= 0 {
            return Err(ConsoleError::validation(
                "banner site is required -- choose a site and retry",
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(ConsoleError::validation(
                "banner end date must be on/after start date",
            ));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ConsoleResult<Payload> {
        let mut fields = Fields::default();
        fields.text("title", self.title.trim());
        fields.number("project_id", self.site_id.get());
        fields.flag("active", self.active);
        fields.date("start_date", self.start_date)?;
        fields.date("end_date", self.end_date)?;
        Ok(fields.into_payload(self.image.clone()))
    }
}

impl NoticeFormInput {
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.heading.trim().is_empty() {
            return Err(ConsoleError::validation(
                "notice heading is required -- enter a heading and retry",
            ));
        }
        if self.text.trim().is_empty() {
            return Err(ConsoleError::validation(
                "notice text is required -- enter the notice body and retry",
            ));
        }
        if self.site_id.get() <= 0 {
            return Err(ConsoleError::validation(
                "notice site is required -- choose a site and retry",
            ));
        }
        if let (Some(publish), Some(expire)) = (self.publish_date, self.expire_date)
            && expire < publish
        {
            return Err(ConsoleError::validation(
                "notice expiry date must be on/after publish date",
            ));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ConsoleResult<Payload> {
        let mut fields = Fields::default();
        fields.number("project_id", self.site_id.get());
        fields.text("notice_heading", self.heading.trim());
        fields.text("notice_text", &self.text);
        fields.text("notice_type", &self.notice_type);
        fields.text("shared", if self.shared { "1" } else { "0" });
        fields.flag("is_important", self.important);
        fields.date("publish_date", self.publish_date)?;
        fields.date("expire_time", self.expire_date)?;
        Ok(fields.into_payload(None))
    }
}

impl EvConsumptionFormInput {
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(ConsoleError::validation(
                "transaction id is required -- enter the charger transaction id and retry",
            ));
        }
        if self.site_id.get() <= 0 {
            return Err(ConsoleError::validation(
                "EV consumption site is required -- choose a site and retry",
            ));
        }
        if self.energy_wh < 0 {
            return Err(ConsoleError::validation("energy consumed cannot be negative"));
        }
        if self.amount_cents < 0 {
            return Err(ConsoleError::validation("charge amount cannot be negative"));
        }
        if let Some(ended_on) = self.ended_on
            && ended_on < self.started_on
        {
            return Err(ConsoleError::validation(
                "EV session end date must be on/after start date",
            ));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ConsoleResult<Payload> {
        let mut fields = Fields::default();
        fields.text("transaction_id", self.transaction_id.trim());
        fields.number("site_id", self.site_id.get());
        fields.number("energy_wh", self.energy_wh);
        fields.number("amount_cents", self.amount_cents);
        fields.date("started_on", Some(self.started_on))?;
        fields.date("ended_on", self.ended_on)?;
        Ok(fields.into_payload(None))
    }
}

impl AdminUserFormInput {
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.firstname.trim().is_empty() {
            return Err(ConsoleError::validation(
                "first name is required -- enter a first name and retry",
            ));
        }
        if !looks_like_email(self.email.trim()) {
            return Err(ConsoleError::validation(format!(
                "{:?} is not an email address -- use name@domain and retry",
                self.email.trim()
            )));
        }
        if self.role_id.get() <= 0 {
            return Err(ConsoleError::validation(
                "admin role is required -- choose a role and retry",
            ));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> Payload {
        let mut fields = Fields::default();
        fields.text("firstname", self.firstname.trim());
        fields.text("lastname", self.lastname.trim());
        fields.text("email", &self.email.trim().to_ascii_lowercase());
        fields.text("mobile", self.mobile.trim());
        fields.number("role_id", self.role_id.get());
        fields.flag("active", self.active);
        fields.into_payload(None)
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Field values kept as JSON so one list can become either body shape.
#[derive(Default)]
struct Fields {
    values: Map<String, Value>,
}

impl Fields {
    fn text(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_owned(), Value::from(value));
    }

    fn number(&mut self, name: &str, value: i64) {
        self.values.insert(name.to_owned(), Value::from(value));
    }

    fn optional_number(&mut self, name: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.number(name, value);
        }
    }

    fn flag(&mut self, name: &str, value: bool) {
        self.values.insert(name.to_owned(), Value::from(value));
    }

    fn date(&mut self, name: &str, value: Option<Date>) -> ConsoleResult<()> {
        let Some(date) = value else {
            return Ok(());
        };
        let formatted = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(|error| ConsoleError::validation(format!("{name}: {error}")))?;
        self.values.insert(name.to_owned(), Value::from(formatted));
        Ok(())
    }

    fn into_payload(self, file: Option<FilePart>) -> Payload {
        let Some(file) = file else {
            return Payload::Json(Value::Object(self.values));
        };
        let fields = self
            .values
            .into_iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (name, text)
            })
            .collect();
        Payload::Multipart(MultipartForm {
            fields,
            files: vec![file],
        })
    }
}
