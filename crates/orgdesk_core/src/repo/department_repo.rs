//! Department repository contract and SQLite implementation.

use crate::db::DbError;
use crate::model::department::{Department, DepartmentId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEPARTMENT_SELECT_SQL: &str = "SELECT id, department_name FROM departments";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for store operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(DepartmentId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "department not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record Store operations for the `departments` table.
pub trait DepartmentRepository {
    /// Inserts a row; the store assigns the id.
    fn insert(&self, department_name: &str) -> RepoResult<Department>;
    fn get(&self, id: DepartmentId) -> RepoResult<Option<Department>>;
    /// Full scan ordered by `id ASC`.
    fn list(&self) -> RepoResult<Vec<Department>>;
    fn update(&self, id: DepartmentId, department_name: &str) -> RepoResult<()>;
    fn delete(&self, id: DepartmentId) -> RepoResult<()>;
}

/// SQLite-backed department repository over a borrowed connection.
///
/// Accepts a plain connection or a `rusqlite::Transaction` (via deref), so
/// the transaction manager can batch several calls into one commit.
pub struct SqliteDepartmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDepartmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DepartmentRepository for SqliteDepartmentRepository<'_> {
    fn insert(&self, department_name: &str) -> RepoResult<Department> {
        self.conn.execute(
            "INSERT INTO departments (department_name) VALUES (?1);",
            [department_name],
        )?;
        Ok(Department {
            id: self.conn.last_insert_rowid(),
            department_name: department_name.to_string(),
        })
    }

    fn get(&self, id: DepartmentId) -> RepoResult<Option<Department>> {
        let department = self
            .conn
            .query_row(
                &format!("{DEPARTMENT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_department_row,
            )
            .optional()?;
        Ok(department)
    }

    fn list(&self) -> RepoResult<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DEPARTMENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let departments = stmt
            .query_map([], parse_department_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(departments)
    }

    fn update(&self, id: DepartmentId, department_name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE departments SET department_name = ?1 WHERE id = ?2;",
            params![department_name, id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&self, id: DepartmentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM departments WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_department_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get("id")?,
        department_name: row.get("department_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{DepartmentRepository, RepoError, SqliteDepartmentRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn insert_assigns_increasing_ids() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDepartmentRepository::new(&conn);

        let first = repo.insert("Engineering").unwrap();
        let second = repo.insert("Finance").unwrap();
        assert!(second.id > first.id);
        assert_eq!(repo.get(first.id).unwrap(), Some(first));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDepartmentRepository::new(&conn);

        let first = repo.insert("Legal").unwrap();
        repo.delete(first.id).unwrap();
        let second = repo.insert("Legal").unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn update_and_delete_missing_rows_return_not_found() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDepartmentRepository::new(&conn);

        assert!(matches!(repo.update(42, "x"), Err(RepoError::NotFound(42))));
        assert!(matches!(repo.delete(42), Err(RepoError::NotFound(42))));
        assert_eq!(repo.get(42).unwrap(), None);
    }

    #[test]
    fn list_is_ordered_by_id() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteDepartmentRepository::new(&conn);
        for name in ["Sales", "Ops", "HR"] {
            repo.insert(name).unwrap();
        }

        let names = repo
            .list()
            .unwrap()
            .into_iter()
            .map(|d| d.department_name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["Sales", "Ops", "HR"]);
    }
}
