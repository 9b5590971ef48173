use orgdesk_core::db::open_db_in_memory;
use orgdesk_core::{
    DepartmentPatch, DepartmentService, NewUser, ServiceError, TxnManager, UserRole,
};
use std::time::Duration;

fn service() -> DepartmentService {
    let conn = open_db_in_memory().unwrap();
    DepartmentService::new(TxnManager::new(conn, Duration::from_secs(2)))
}

#[test]
fn create_then_get_returns_identical_record() {
    let service = service();

    let created = service.create_department("Engineering").unwrap();
    assert_eq!(created.department_name, "Engineering");

    let loaded = service.get_department(created.id).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn get_missing_department_is_not_found() {
    let service = service();
    assert!(matches!(
        service.get_department(12345),
        Err(ServiceError::NotFound(12345))
    ));
}

#[test]
fn delete_then_get_is_not_found() {
    let service = service();
    let created = service.create_department("Temp").unwrap();

    service.delete_department(created.id).unwrap();

    assert!(matches!(
        service.get_department(created.id),
        Err(ServiceError::NotFound(id)) if id == created.id
    ));
    assert!(matches!(
        service.delete_department(created.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn update_applies_patch_and_commits() {
    let service = service();
    let created = service.create_department("Ops").unwrap();

    let updated = service
        .update_department(created.id, &DepartmentPatch::rename("Operations"))
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.department_name, "Operations");
    assert_eq!(service.get_department(created.id).unwrap(), updated);

    let unchanged = service
        .update_department(created.id, &DepartmentPatch::default())
        .unwrap();
    assert_eq!(unchanged.department_name, "Operations");
}

#[test]
fn updates_on_missing_rows_are_not_found() {
    let service = service();
    let patch = DepartmentPatch::rename("Ghost");

    assert!(matches!(
        service.update_department(77, &patch),
        Err(ServiceError::NotFound(77))
    ));
    assert!(matches!(
        service.update_department_locked(77, &patch),
        Err(ServiceError::NotFound(77))
    ));
    assert_eq!(service.manager().stats().locked_rows, 0);
}

#[test]
fn invalid_names_are_rejected_before_any_write() {
    let service = service();
    assert!(matches!(
        service.create_department("  "),
        Err(ServiceError::Validation(_))
    ));

    let created = service.create_department("Legal").unwrap();
    assert!(matches!(
        service.update_department_locked(created.id, &DepartmentPatch::rename("")),
        Err(ServiceError::Validation(_))
    ));
    assert_eq!(
        service.get_department(created.id).unwrap().department_name,
        "Legal"
    );
}

#[test]
fn list_returns_committed_rows_in_id_order() {
    let service = service();
    let a = service.create_department("A").unwrap();
    let b = service.create_department("B").unwrap();
    let c = service.create_department("C").unwrap();
    service.delete_department(b.id).unwrap();

    let listed = service.list_departments().unwrap();
    assert_eq!(listed, vec![a, c]);
}

#[test]
fn users_are_listed_without_passwords_and_with_sorted_skills() {
    let service = service();
    let department = service.create_department("Platform").unwrap();

    let created = service
        .create_user(&NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "s3cret".to_string(),
            login: "ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+100000".to_string(),
            role: UserRole::Admin,
            department_id: Some(department.id),
            skills: vec!["rust".to_string(), "math".to_string(), "rust".to_string()],
        })
        .unwrap();
    assert_eq!(created.skills, ["math", "rust"]);

    let users = service.list_users().unwrap();
    assert_eq!(users, vec![created]);

    let json = serde_json::to_value(&users[0]).unwrap();
    assert!(json.get("password").is_none());
    assert_eq!(json["role"], "ADMIN");
}
