//! Method + path routing onto `Api` operations.
//!
//! # Invariants
//! - Trailing slashes are ignored.
//! - Unknown paths -> 404, known paths with the wrong method -> 405.
//! - Unparseable ids or bodies -> 422 before any store access.

use crate::api::{Api, ApiResponse, CreateDepartmentBody, DoubleUpdateBody};
use log::debug;
use orgdesk_core::{DepartmentId, DepartmentPatch};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Root,
    ListDepartments,
    CreateDepartment,
    GetDepartment(DepartmentId),
    UpdateDepartment(DepartmentId),
    DeleteDepartment(DepartmentId),
    DirtyRead(DepartmentId),
    Concurrent(DepartmentId),
    ConcurrentUpdate(DepartmentId),
    DirtyUpdate(DepartmentId),
    ListUsers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RouteError {
    NotFound,
    MethodNotAllowed,
    InvalidId(String),
}

impl Api {
    /// Routes one request. `body` is the raw JSON text, if any.
    pub fn dispatch(&self, method: &str, path: &str, body: Option<&str>) -> ApiResponse {
        let method = method.trim().to_ascii_uppercase();
        debug!("event=api_dispatch module=api status=start method={method} path={path}");

        let route = match resolve(&method, path) {
            Ok(route) => route,
            Err(RouteError::NotFound) => return ApiResponse::detail(404, "Not Found"),
            Err(RouteError::MethodNotAllowed) => {
                return ApiResponse::detail(405, "Method Not Allowed")
            }
            Err(RouteError::InvalidId(raw)) => {
                return ApiResponse::detail(422, format!("invalid department id `{raw}`"))
            }
        };

        match route {
            Route::Root => self.root(),
            Route::ListDepartments => self.list_departments(),
            Route::CreateDepartment => {
                with_body(body, |input: CreateDepartmentBody| self.create_department(&input))
            }
            Route::GetDepartment(id) => self.get_department(id),
            Route::UpdateDepartment(id) => {
                with_body(body, |patch: DepartmentPatch| self.update_department(id, &patch))
            }
            Route::DeleteDepartment(id) => self.delete_department(id),
            Route::DirtyRead(id) => self.dirty_read(id),
            Route::Concurrent(id) => {
                with_body(body, |input: DoubleUpdateBody| self.concurrent(id, &input))
            }
            Route::ConcurrentUpdate(id) => {
                with_body(body, |input: DoubleUpdateBody| self.concurrent_update(id, &input))
            }
            Route::DirtyUpdate(id) => {
                with_body(body, |patch: DepartmentPatch| self.dirty_update(id, &patch))
            }
            Route::ListUsers => self.list_users(),
        }
    }
}

fn resolve(method: &str, path: &str) -> Result<Route, RouteError> {
    let path = path.split('?').next().unwrap_or_default();
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    let route = match (method, segments.as_slice()) {
        ("GET", []) => Route::Root,
        ("GET", ["departments"]) => Route::ListDepartments,
        ("POST", ["departments"]) => Route::CreateDepartment,
        ("GET", ["departments", "dirty-read", id]) => Route::DirtyRead(parse_id(id)?),
        ("PUT", ["departments", "concurrent", id]) => Route::Concurrent(parse_id(id)?),
        ("PUT", ["departments", "concurrent-update", id]) => {
            Route::ConcurrentUpdate(parse_id(id)?)
        }
        ("PUT", ["departments", "dirty-update", id]) => Route::DirtyUpdate(parse_id(id)?),
        ("GET", ["departments", id]) => Route::GetDepartment(parse_id(id)?),
        ("PUT", ["departments", id]) => Route::UpdateDepartment(parse_id(id)?),
        ("DELETE", ["departments", id]) => Route::DeleteDepartment(parse_id(id)?),
        ("GET", ["users"]) => Route::ListUsers,
        (_, segments) if is_known_path(segments) => return Err(RouteError::MethodNotAllowed),
        _ => return Err(RouteError::NotFound),
    };
    Ok(route)
}

fn is_known_path(segments: &[&str]) -> bool {
    matches!(
        segments,
        []
            | ["departments"]
            | ["departments", _]
            | ["departments", "dirty-read" | "concurrent" | "concurrent-update" | "dirty-update", _]
            | ["users"]
    )
}

fn parse_id(raw: &str) -> Result<DepartmentId, RouteError> {
    raw.parse::<DepartmentId>()
        .map_err(|_| RouteError::InvalidId(raw.to_string()))
}

fn with_body<T: DeserializeOwned>(
    body: Option<&str>,
    handler: impl FnOnce(T) -> ApiResponse,
) -> ApiResponse {
    let Some(raw) = body.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return ApiResponse::detail(422, "request body is required");
    };
    match serde_json::from_str::<T>(raw) {
        Ok(input) => handler(input),
        Err(err) => ApiResponse::detail(422, format!("invalid request body: {err}")),
    }
}
