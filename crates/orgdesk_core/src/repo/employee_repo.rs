//! Employee collaborator repository.
//!
//! # Responsibility
//! - List employees with their skill names for the user listing surface.
//! - Insert employees (and any skills they reference) for seeding.
//!
//! # Invariants
//! - `password` is written but never read back out of this module.
//! - Skill names are reused by exact match instead of duplicated.

use crate::model::employee::{EmployeeId, NewUser, UserRecord, UserRole};
use crate::repo::department_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

/// Read/insert contract for the `employee` table.
pub trait EmployeeRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserRecord>;
    /// All employees ordered by `id ASC`.
    fn list_users(&self) -> RepoResult<Vec<UserRecord>>;
}

pub struct SqliteEmployeeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EmployeeRepository for SqliteEmployeeRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserRecord> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO employee (
                first_name,
                last_name,
                password,
                login,
                email,
                phone,
                role,
                department_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                user.first_name,
                user.last_name,
                user.password,
                user.login,
                user.email,
                user.phone,
                user.role.as_db_str(),
                user.department_id,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let mut skills = user.skills.clone();
        skills.sort();
        skills.dedup();
        for skill_name in &skills {
            let skill_id = ensure_skill(&tx, skill_name)?;
            tx.execute(
                "INSERT INTO employee_skills (employee_id, skill_id) VALUES (?1, ?2);",
                params![id, skill_id],
            )?;
        }
        tx.commit()?;

        Ok(UserRecord {
            id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            login: user.login.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            department_id: user.department_id,
            skills,
        })
    }

    fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let mut skills_by_employee = load_skill_names(self.conn)?;

        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, login, email, phone, role, department_id
             FROM employee
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            let mut user = parse_user_row(row)?;
            user.skills = skills_by_employee.remove(&user.id).unwrap_or_default();
            users.push(user);
        }
        Ok(users)
    }
}

fn ensure_skill(conn: &Connection, skill_name: &str) -> RepoResult<i64> {
    let existing = conn
        .query_row(
            "SELECT id FROM skills WHERE skill_name = ?1 ORDER BY id LIMIT 1;",
            [skill_name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO skills (skill_name) VALUES (?1);", [skill_name])?;
    Ok(conn.last_insert_rowid())
}

fn load_skill_names(conn: &Connection) -> RepoResult<BTreeMap<EmployeeId, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT es.employee_id, s.skill_name
         FROM employee_skills es
         JOIN skills s ON s.id = es.skill_id
         ORDER BY es.employee_id ASC, s.skill_name ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut skills: BTreeMap<EmployeeId, Vec<String>> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        skills
            .entry(row.get(0)?)
            .or_default()
            .push(row.get(1)?);
    }
    Ok(skills)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<UserRecord> {
    let role_text: String = row.get("role")?;
    let role = UserRole::parse_db_str(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in employee.role"))
    })?;

    Ok(UserRecord {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        login: row.get("login")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        role,
        department_id: row.get("department_id")?,
        skills: Vec::new(),
    })
}
