//! Status-coded use-case API over the department core.
//!
//! # Responsibility
//! - Expose one function per department/user operation, returning an
//!   HTTP-style status code plus a JSON body.
//! - Map core failures onto stable status codes.
//!
//! # Invariants
//! - Functions never panic; every failure becomes a response.
//! - `NotFound` -> 404, validation -> 422, everything else -> 500.
//! - Error bodies are `{"detail": "<message>"}`.

use log::{info, warn};
use orgdesk_core::{
    core_version, ping, ConcurrencyDemo, CoreConfig, DemoSettings, DepartmentId,
    DepartmentPatch, DepartmentService, ServiceError, ServiceResult, TxnManager,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Response envelope: status code and JSON body (`Value::Null` for 204).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: impl Serialize) -> Self {
        Self::with_body(200, body)
    }

    fn created(body: impl Serialize) -> Self {
        Self::with_body(201, body)
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    pub(crate) fn detail(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": message.into() }),
        }
    }

    fn with_body(status: u16, body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(err) => Self::detail(500, format!("response encoding failed: {err}")),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDepartmentBody {
    pub department_name: String,
}

/// Two patches applied in order by the double-update operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleUpdateBody {
    pub first: DepartmentPatch,
    pub second: DepartmentPatch,
}

/// Request handler bound to one store.
#[derive(Clone)]
pub struct Api {
    service: DepartmentService,
    demo: ConcurrencyDemo,
}

impl Api {
    pub fn new(manager: TxnManager, config: &CoreConfig) -> Self {
        let service = DepartmentService::new(manager);
        let demo = ConcurrencyDemo::new(service.clone(), DemoSettings::from_config(config));
        Self { service, demo }
    }

    /// Opens the store named by `config` and binds an API to it.
    pub fn open(config: &CoreConfig) -> Result<Self, String> {
        let manager =
            TxnManager::open(config).map_err(|err| format!("store open failed: {err}"))?;
        info!(
            "event=api_open module=api status=ok store={} lock_timeout_ms={} demo_delay_ms={} dirty_read_isolation={}",
            config
                .db_path
                .as_ref()
                .map_or_else(|| "memory".to_string(), |path| path.display().to_string()),
            config.lock_timeout_ms,
            config.demo_delay_ms,
            config.dirty_read_isolation.as_str()
        );
        Ok(Self::new(manager, config))
    }

    pub fn service(&self) -> &DepartmentService {
        &self.service
    }

    /// `GET /` health probe.
    pub fn root(&self) -> ApiResponse {
        ApiResponse::ok(json!({ "message": ping(), "version": core_version() }))
    }

    /// `POST /departments/` -> 201.
    pub fn create_department(&self, body: &CreateDepartmentBody) -> ApiResponse {
        respond(
            "create_department",
            self.service.create_department(&body.department_name),
            ApiResponse::created,
        )
    }

    /// `GET /departments/{id}`.
    pub fn get_department(&self, id: DepartmentId) -> ApiResponse {
        respond(
            "get_department",
            self.service.get_department(id),
            ApiResponse::ok,
        )
    }

    /// `PUT /departments/{id}`: locked read-modify-write.
    pub fn update_department(&self, id: DepartmentId, patch: &DepartmentPatch) -> ApiResponse {
        respond(
            "update_department",
            self.demo.locked_update(id, patch),
            ApiResponse::ok,
        )
    }

    /// `GET /departments/dirty-read/{id}`.
    pub fn dirty_read(&self, id: DepartmentId) -> ApiResponse {
        respond("dirty_read", self.demo.dirty_read(id), ApiResponse::ok)
    }

    /// `GET /departments/`.
    pub fn list_departments(&self) -> ApiResponse {
        respond(
            "list_departments",
            self.service.list_departments(),
            ApiResponse::ok,
        )
    }

    /// `DELETE /departments/{id}` -> 204.
    pub fn delete_department(&self, id: DepartmentId) -> ApiResponse {
        respond(
            "delete_department",
            self.service.delete_department(id),
            |()| ApiResponse::no_content(),
        )
    }

    /// `PUT /departments/concurrent/{id}`: two unlocked updates back-to-back.
    pub fn concurrent(&self, id: DepartmentId, body: &DoubleUpdateBody) -> ApiResponse {
        respond(
            "concurrent",
            self.demo
                .sequential_double_update(id, &body.first, &body.second),
            ApiResponse::ok,
        )
    }

    /// `PUT /departments/concurrent-update/{id}`: locked double update with a hold.
    pub fn concurrent_update(&self, id: DepartmentId, body: &DoubleUpdateBody) -> ApiResponse {
        respond(
            "concurrent_update",
            self.demo
                .locked_double_update_with_delay(id, &body.first, &body.second),
            ApiResponse::ok,
        )
    }

    /// `PUT /departments/dirty-update/{id}`: flushed write held open, then committed.
    pub fn dirty_update(&self, id: DepartmentId, patch: &DepartmentPatch) -> ApiResponse {
        respond(
            "dirty_update",
            self.demo.dirty_update_window(id, patch),
            ApiResponse::ok,
        )
    }

    /// `GET /users/`.
    pub fn list_users(&self) -> ApiResponse {
        respond("list_users", self.service.list_users(), ApiResponse::ok)
    }
}

fn respond<T>(
    operation: &'static str,
    result: ServiceResult<T>,
    on_success: impl FnOnce(T) -> ApiResponse,
) -> ApiResponse {
    let response = match result {
        Ok(value) => on_success(value),
        Err(err) => error_response(&err),
    };
    if response.status >= 500 {
        warn!(
            "event=api_request module=api status=error op={operation} status_code={} detail={}",
            response.status, response.body["detail"]
        );
    } else {
        info!(
            "event=api_request module=api status=ok op={operation} status_code={}",
            response.status
        );
    }
    response
}

fn error_response(err: &ServiceError) -> ApiResponse {
    match err {
        ServiceError::NotFound(_) => ApiResponse::detail(404, "Department not found"),
        ServiceError::Validation(err) => ApiResponse::detail(422, err.to_string()),
        ServiceError::Txn(err) => ApiResponse::detail(500, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Api, CreateDepartmentBody, DoubleUpdateBody};
    use orgdesk_core::db::open_db_in_memory;
    use orgdesk_core::{CoreConfig, DepartmentPatch, NewUser, TxnManager, UserRole};
    use serde_json::json;
    use std::time::Duration;

    fn api() -> Api {
        let config = CoreConfig {
            demo_delay_ms: 20,
            lock_timeout_ms: 200,
            ..CoreConfig::default()
        };
        let manager = TxnManager::new(open_db_in_memory().unwrap(), config.lock_timeout());
        Api::new(manager, &config)
    }

    fn create(api: &Api, name: &str) -> i64 {
        let response = api.create_department(&CreateDepartmentBody {
            department_name: name.to_string(),
        });
        assert_eq!(response.status, 201);
        response.body["id"].as_i64().unwrap()
    }

    #[test]
    fn create_get_list_delete_status_codes() {
        let api = api();
        let id = create(&api, "Engineering");

        let fetched = api.get_department(id);
        assert_eq!(fetched.status, 200);
        assert_eq!(
            fetched.body,
            json!({ "id": id, "department_name": "Engineering" })
        );

        assert_eq!(api.list_departments().body.as_array().unwrap().len(), 1);

        let deleted = api.delete_department(id);
        assert_eq!(deleted.status, 204);
        assert!(deleted.body.is_null());

        assert_eq!(api.get_department(id).status, 404);
        assert_eq!(api.delete_department(id).status, 404);
    }

    #[test]
    fn not_found_and_validation_map_to_404_and_422() {
        let api = api();
        let missing = api.update_department(404, &DepartmentPatch::rename("x"));
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body["detail"], "Department not found");

        assert_eq!(api.dirty_read(404).status, 404);
        assert_eq!(
            api.dirty_update(404, &DepartmentPatch::rename("x")).status,
            404
        );

        let invalid = api.create_department(&CreateDepartmentBody {
            department_name: " ".to_string(),
        });
        assert_eq!(invalid.status, 422);
    }

    #[test]
    fn lock_timeout_maps_to_500() {
        let api = api();
        let id = create(&api, "Contended");

        let mut holder = api.service().manager().begin();
        holder.lock_for_update(id).unwrap();

        let response = api.update_department(id, &DepartmentPatch::rename("Blocked"));
        assert_eq!(response.status, 500);
        assert!(response.body["detail"]
            .as_str()
            .unwrap()
            .contains("row lock"));
        holder.rollback();
    }

    #[test]
    fn double_update_operations_return_final_record() {
        let api = api();
        let id = create(&api, "Start");
        let body = DoubleUpdateBody {
            first: DepartmentPatch::rename("One"),
            second: DepartmentPatch::rename("Two"),
        };

        let sequential = api.concurrent(id, &body);
        assert_eq!(sequential.status, 200);
        assert_eq!(sequential.body["department_name"], "Two");

        let locked = api.concurrent_update(
            id,
            &DoubleUpdateBody {
                first: DepartmentPatch::rename("Three"),
                second: DepartmentPatch::rename("Four"),
            },
        );
        assert_eq!(locked.status, 200);
        assert_eq!(locked.body["department_name"], "Four");
        assert_eq!(api.get_department(id).body["department_name"], "Four");
    }

    #[test]
    fn dirty_update_commits_after_hold() {
        let api = api();
        let id = create(&api, "Before");

        let started = std::time::Instant::now();
        let response = api.dirty_update(id, &DepartmentPatch::rename("After"));
        assert_eq!(response.status, 200);
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(api.get_department(id).body["department_name"], "After");
    }

    #[test]
    fn users_listing_hides_passwords() {
        let api = api();
        api.service()
            .create_user(&NewUser {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                password: "hunter2".to_string(),
                login: "grace".to_string(),
                email: "grace@example.com".to_string(),
                phone: "+200000".to_string(),
                role: UserRole::User,
                department_id: None,
                skills: Vec::new(),
            })
            .unwrap();

        let response = api.list_users();
        assert_eq!(response.status, 200);
        let users = response.body.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["role"], "USER");
        assert!(users[0].get("password").is_none());
    }

    #[test]
    fn root_reports_pong() {
        assert_eq!(api().root().body["message"], "pong");
    }
}
