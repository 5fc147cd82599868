// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::ids::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Companies,
    Communities,
    ClubMemberships,
    Journals,
    Expenses,
    FitoutRequests,
    ParkingBookings,
    FnbOrders,
    Projects,
    Employees,
    Documents,
    Folders,
    Banners,
    Notices,
    EvConsumptions,
    AdminUsers,
}

/// Per-endpoint conventions the backend never states in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub collection_path: &'static str,
    pub member_base: &'static str,
    /// Keys that may hold the item array, highest priority first.
    pub collection_keys: &'static [&'static str],
    pub wrapper_key: Option<&'static str>,
    pub search_param: Option<&'static str>,
    pub filter_params: &'static [(&'static str, &'static str)],
}

impl EndpointDescriptor {
    pub fn member_path(&self, id: EntityId) -> String {
        format!("{}/{}.json", self.member_base, id.get())
    }

    pub fn filter_param(&self, key: &str) -> Option<&'static str> {
        self.filter_params
            .iter()
            .find(|(client_key, _)| *client_key == key)
            .map(|(_, param)| *param)
    }

    pub fn filter_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filter_params.iter().map(|(key, _)| *key)
    }
}

const DATE_RANGE: (&str, &str) = ("date_range", "q[date_range]");

impl ResourceKind {
    pub const ALL: [Self; 16] = [
        Self::Companies,
        Self::Communities,
        Self::ClubMemberships,
        Self::Journals,
        Self::Expenses,
        Self::FitoutRequests,
        Self::ParkingBookings,
        Self::FnbOrders,
        Self::Projects,
        Self::Employees,
        Self::Documents,
        Self::Folders,
        Self::Banners,
        Self::Notices,
        Self::EvConsumptions,
        Self::AdminUsers,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Communities => "communities",
            Self::ClubMemberships => "club-memberships",
            Self::Journals => "journals",
            Self::Expenses => "expenses",
            Self::FitoutRequests => "fitout-requests",
            Self::ParkingBookings => "parking",
            Self::FnbOrders => "fnb-orders",
            Self::Projects => "projects",
            Self::Employees => "employees",
            Self::Documents => "documents",
            Self::Folders => "folders",
            Self::Banners => "banners",
            Self::Notices => "notices",
            Self::EvConsumptions => "ev-consumptions",
            Self::AdminUsers => "admin-users",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    /// Endpoint paths inferred from naming convention rather than observed traffic.
    pub const fn path_is_assumed(self) -> bool {
        matches!(
            self,
            Self::Journals | Self::Expenses | Self::Documents | Self::Folders | Self::Banners
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Companies => "company",
            Self::Communities => "community",
            Self::ClubMemberships => "club member",
            Self::Journals => "journal",
            Self::Expenses => "expense",
            Self::FitoutRequests => "fitout request",
            Self::ParkingBookings => "parking booking",
            Self::FnbOrders => "F&B order",
            Self::Projects => "project",
            Self::Employees => "employee",
            Self::Documents => "document",
            Self::Folders => "folder",
            Self::Banners => "banner",
            Self::Notices => "notice",
            Self::EvConsumptions => "EV consumption record",
            Self::AdminUsers => "admin user",
        }
    }

    /// Routes and query keys for this resource. Paths for the kinds where
    /// [`ResourceKind::path_is_assumed`] holds follow the backend's naming
    /// convention but have not been confirmed against a live console.
    pub fn endpoint(self) -> EndpointDescriptor {
        match self {
            Self::Companies => EndpointDescriptor {
                collection_path: "/pms/company_setups/company_index.json",
                member_base: "/pms/company_setups",
                collection_keys: &["companies", "data"],
                wrapper_key: Some("pms_company_setup"),
                search_param: Some("q[name_cont]"),
                filter_params: &[
                    ("organization_id", "q[organization_id_eq]"),
                    ("country_id", "q[country_id_eq]"),
                ],
            },
            Self::Communities => EndpointDescriptor {
                collection_path: "/communities.json",
                member_base: "/communities",
                collection_keys: &["communities", "data"],
                wrapper_key: Some("community"),
                search_param: Some("q[name_cont]"),
                filter_params: &[
                    ("active", "q[active_eq]"),
                    ("organization_id", "q[organization_id_eq]"),
                ],
            },
            Self::ClubMemberships => EndpointDescriptor {
                collection_path: "/club_members.json",
                member_base: "/club_members",
                collection_keys: &["club_members", "data"],
                wrapper_key: Some("club_member"),
                search_param: Some(
                    "q[user_firstname_or_user_email_or_user_lastname_or_user_mobile_cont]",
                ),
                filter_params: &[
                    ("club_member_enabled", "q[club_member_enabled_eq]"),
                    ("access_card_enabled", "q[access_card_enabled_eq]"),
                    ("start_date", "q[start_date_eq]"),
                    ("end_date", "q[end_date_eq]"),
                    ("flat_id", "q[user_flat_society_flat_id_eq]"),
                ],
            },
            // Assumed: journals, expenses, documents, folders and banners.
            Self::Journals => EndpointDescriptor {
                collection_path: "/journals.json",
                member_base: "/journals",
                collection_keys: &["journals", "data"],
                wrapper_key: Some("journal"),
                search_param: Some("q[reference_cont]"),
                filter_params: &[DATE_RANGE, ("account_id", "q[account_id_eq]")],
            },
            Self::Expenses => EndpointDescriptor {
                collection_path: "/expenses.json",
                member_base: "/expenses",
                collection_keys: &["expenses", "data"],
                wrapper_key: Some("expense"),
                search_param: Some("q[description_cont]"),
                filter_params: &[DATE_RANGE, ("category_id", "q[category_id_eq]")],
            },
            Self::FitoutRequests => EndpointDescriptor {
                collection_path: "/fitout_requests.json",
                member_base: "/fitout_requests",
                collection_keys: &["fitout_requests", "data"],
                wrapper_key: Some("fitout_request"),
                search_param: Some("q[search_all_fields_cont]"),
                filter_params: &[
                    ("status", "q[status_eq]"),
                    ("tower_id", "q[tower_id_eq]"),
                ],
            },
            Self::ParkingBookings => EndpointDescriptor {
                collection_path: "/pms/parking_bookings.json",
                member_base: "/pms/parking_bookings",
                collection_keys: &["parking_bookings", "data"],
                wrapper_key: Some("parking_booking"),
                search_param: Some("q[search_all_fields_cont]"),
                filter_params: &[
                    (
                        "parking_category_id",
                        "q[parking_configuration_parking_category_id_eq]",
                    ),
                    ("status", "q[status_eq]"),
                    DATE_RANGE,
                ],
            },
            Self::FnbOrders => EndpointDescriptor {
                collection_path: "/pms/food_orders.json",
                member_base: "/pms/food_orders",
                collection_keys: &["food_orders", "data"],
                wrapper_key: Some("food_order"),
                search_param: Some("q[search_all_fields_cont]"),
                filter_params: &[
                    ("status", "q[status_eq]"),
                    ("restaurant_id", "q[restaurant_id_eq]"),
                    DATE_RANGE,
                ],
            },
            Self::Projects => EndpointDescriptor {
                collection_path: "/project_managements.json",
                member_base: "/project_managements",
                collection_keys: &["project_managements", "data"],
                wrapper_key: Some("project_management"),
                search_param: Some("q[title_cont]"),
                filter_params: &[
                    ("status", "q[status_eq]"),
                    ("owner_id", "q[owner_id_eq]"),
                    ("start_date", "q[start_date_eq]"),
                    ("end_date", "q[end_date_eq]"),
                ],
            },
            Self::Employees => EndpointDescriptor {
                collection_path: "/pms/users.json",
                member_base: "/pms/users",
                collection_keys: &["users", "employees", "data"],
                wrapper_key: Some("user"),
                search_param: Some("q[firstname_or_lastname_or_email_or_mobile_cont]"),
                filter_params: &[
                    ("department_id", "q[department_id_eq]"),
                    ("site_id", "q[site_id_eq]"),
                ],
            },
            Self::Documents => EndpointDescriptor {
                collection_path: "/documents.json",
                member_base: "/documents",
                collection_keys: &["documents", "data"],
                wrapper_key: Some("document"),
                search_param: Some("q[title_cont]"),
                filter_params: &[("folder_id", "q[folder_id_eq]")],
            },
            Self::Folders => EndpointDescriptor {
                collection_path: "/folders.json",
                member_base: "/folders",
                collection_keys: &["folders", "data"],
                wrapper_key: Some("folder"),
                search_param: Some("q[name_cont]"),
                filter_params: &[("parent_id", "q[parent_id_eq]")],
            },
            Self::Banners => EndpointDescriptor {
                collection_path: "/pms/banners.json",
                member_base: "/pms/banners",
                collection_keys: &["banners", "data"],
                wrapper_key: Some("banner"),
                search_param: Some("q[title_cont]"),
                filter_params: &[("active", "q[active_eq]"), ("site_id", "q[site_id_eq]")],
            },
            Self::Notices => EndpointDescriptor {
                collection_path: "/pms/admin/noticeboards.json",
                member_base: "/pms/admin/noticeboards",
                collection_keys: &["noticeboards", "data"],
                wrapper_key: Some("noticeboard"),
                search_param: Some("q[notice_title_cont]"),
                filter_params: &[("status", "q[status_eq]"), ("shared", "q[shared_eq]")],
            },
            Self::EvConsumptions => EndpointDescriptor {
                collection_path: "/ev_consumptions.json",
                member_base: "/ev_consumptions",
                collection_keys: &["ev_consumptions", "data"],
                wrapper_key: Some("ev_consumption"),
                search_param: Some("q[transaction_id_cont]"),
                filter_params: &[DATE_RANGE, ("site_id", "q[site_id_eq]")],
            },
            Self::AdminUsers => EndpointDescriptor {
                collection_path: "/admin/users.json",
                member_base: "/admin/users",
                collection_keys: &["users", "data"],
                wrapper_key: None,
                search_param: Some("q[email_cont]"),
                filter_params: &[("active", "q[active_eq]"), ("role_id", "q[role_id_eq]")],
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn from_total(total_count: i64, current_page: i64, per_page: i64) -> Self {
        let total_count = total_count.max(0);
        let total_pages = if per_page > 0 {
            total_count / per_page + i64::from(total_count % per_page != 0)
        } else {
            0
        };
        Self {
            current_page,
            total_pages,
            total_count,
            per_page,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }

    /// Last-resort layout when the backend reports nothing: the page we have is all there is.
    pub fn from_items(len: usize, current_page: i64, per_page: i64) -> Self {
        let total_count = i64::try_from(len).unwrap_or(i64::MAX);
        let total_pages = if total_count == 0 { 0 } else { current_page.max(1) };
        Self {
            current_page,
            total_pages,
            total_count,
            per_page,
            has_next: false,
            has_prev: current_page > 1,
        }
    }

    pub fn clamp_page(&self, page: i64) -> i64 {
        if self.total_pages <= 0 {
            return 1;
        }
        page.clamp(1, self.total_pages)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Default for ListPage<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: None,
        }
    }
}

impl<T> ListPage<T> {
    pub fn new(items: Vec<T>, pagination: Option<Pagination>) -> Self {
        Self { items, pagination }
    }

    pub fn pagination_or_fallback(&self, current_page: i64, per_page: i64) -> Pagination {
        self.pagination
            .unwrap_or_else(|| Pagination::from_items(self.items.len(), current_page, per_page))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Create,
    Update,
    Patch,
    Delete,
}

impl MutationKind {
    pub const fn method(self) -> &'static str {
        match self {
            Self::Create => "POST",
            Self::Update => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update | Self::Patch => "updated",
            Self::Delete => "deleted",
        }
    }

    pub const fn needs_id(self) -> bool {
        !matches!(self, Self::Create)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub kind: MutationKind,
    pub id: Option<EntityId>,
    pub payload: Payload,
}

impl MutationRequest {
    pub fn create(payload: Payload) -> Self {
        Self {
            kind: MutationKind::Create,
            id: None,
            payload,
        }
    }

    pub fn update(id: EntityId, payload: Payload) -> Self {
        Self {
            kind: MutationKind::Update,
            id: Some(id),
            payload,
        }
    }

    pub fn patch(id: EntityId, payload: Payload) -> Self {
        Self {
            kind: MutationKind::Patch,
            id: Some(id),
            payload,
        }
    }

    pub fn delete(id: EntityId) -> Self {
        Self {
            kind: MutationKind::Delete,
            id: Some(id),
            payload: Payload::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    pub status: u16,
    pub body: Value,
}

const LABEL_FIELDS: [&str; 8] = [
    "name",
    "title",
    "notice_title",
    "transaction_id",
    "email",
    "order_number",
    "reference",
    "description",
];

/// Display projection of one backend row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub id: Option<EntityId>,
    pub label: String,
    pub status: Option<String>,
    pub created_at: Option<OffsetDateTime>,
}

impl EntityRow {
    pub fn from_value(value: &Value) -> Self {
        let id = value.get("id").and_then(|raw| match raw {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        });

        let label = LABEL_FIELDS
            .iter()
            .find_map(|field| {
                value
                    .get(*field)
                    .and_then(Value::as_str)
                    .filter(|text| !text.trim().is_empty())
            })
            .map(str::to_owned)
            .or_else(|| full_name(value))
            .unwrap_or_default();

        let status = ["status", "current_status"]
            .iter()
            .find_map(|field| value.get(*field))
            .and_then(|raw| match raw {
                Value::String(text) => Some(text.clone()),
                Value::Bool(flag) => Some(flag.to_string()),
                _ => None,
            });

        let created_at = value
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());

        Self {
            id: id.map(EntityId::new),
            label,
            status,
            created_at,
        }
    }
}

fn full_name(value: &Value) -> Option<String> {
    let first = value
        .get("firstname")
        .or_else(|| value.get("first_name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let last = value
        .get("lastname")
        .or_else(|| value.get("last_name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let joined = format!("{first} {last}").trim().to_owned();
    (!joined.is_empty()).then_some(joined)
}
