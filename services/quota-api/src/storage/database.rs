use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::usage::UsageSummary;

use super::error::StorageError;
use super::schema::init_database;
use super::QUOTA_DB_FILENAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub disabled: bool,
    pub last_login: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    pub quota_id: i64,
    pub pi_name: String,
    pub student_name: String,
    pub usage: u64,
    pub soft_limit: u64,
    pub hard_limit: u64,
    pub files: u64,
}

#[derive(Debug, Clone)]
pub struct NewQuota {
    pub pi_name: String,
    pub student_name: String,
    pub usage: u64,
    pub soft_limit: u64,
    pub hard_limit: u64,
    pub files: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub pi_name: String,
    pub timestamp: String,
    pub number_of_users: u64,
    pub total_usage: u64,
    pub usage_average: f64,
    pub max_individual_usage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    pub username: String,
    pub login_time: String,
}

pub struct QuotaDatabase {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl QuotaDatabase {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(QUOTA_DB_FILENAME);
        let is_new = !db_path.exists();
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_database(&conn)?;

        if is_new {
            info!(path = %db_path.display(), "initialized quota database");
        }

        Ok(Self {
            path: db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, username, email, hashed_password, disabled, last_login, is_admin
            FROM users
            WHERE username = ?1
            "#,
        )?;

        let user = stmt.query_row(params![username], user_from_row).optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, username, email, hashed_password, disabled, last_login, is_admin
            FROM users
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([], user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn insert_user(&self, user: &NewUser) -> Result<i64, StorageError> {
        if user.username.trim().is_empty() {
            return Err(StorageError::InvalidRecord("username cannot be empty".into()));
        }

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO users (username, email, hashed_password, disabled, is_admin)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
            params![user.username, user.email, user.hashed_password, user.is_admin],
        )?;

        debug!(username = %user.username, is_admin = user.is_admin, "inserted user");
        Ok(conn.last_insert_rowid())
    }

    pub fn set_user_disabled(&self, username: &str, disabled: bool) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET disabled = ?2 WHERE username = ?1",
            params![username, disabled],
        )?;
        Ok(())
    }

    pub fn touch_last_login(&self, username: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET last_login = ?2 WHERE username = ?1",
            params![username, format_timestamp(at)],
        )?;
        Ok(())
    }

    pub fn insert_quota(&self, quota: &NewQuota) -> Result<i64, StorageError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO quotas (pi_name, student_name, usage, soft_limit, hard_limit, files)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                quota.pi_name,
                quota.student_name,
                quota.usage as i64,
                quota.soft_limit as i64,
                quota.hard_limit as i64,
                quota.files as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count_quotas(&self) -> Result<u64, StorageError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM quotas", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn quotas_for_pi(&self, pi_name: &str) -> Result<Vec<QuotaRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT quota_id, pi_name, student_name, usage, soft_limit, hard_limit, files
            FROM quotas
            WHERE pi_name = ?1
            ORDER BY quota_id
            "#,
        )?;

        let rows = stmt.query_map(params![pi_name], quota_from_row)?;
        let mut quotas = Vec::new();
        for row in rows {
            quotas.push(row?);
        }
        Ok(quotas)
    }

    pub fn all_quotas(&self) -> Result<Vec<QuotaRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT quota_id, pi_name, student_name, usage, soft_limit, hard_limit, files
            FROM quotas
            ORDER BY pi_name, quota_id
            "#,
        )?;

        let rows = stmt.query_map([], quota_from_row)?;
        let mut quotas = Vec::new();
        for row in rows {
            quotas.push(row?);
        }
        Ok(quotas)
    }

    pub fn record_login(&self, username: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO login_history (username, login_time) VALUES (?1, ?2)",
            params![username, format_timestamp(at)],
        )?;
        Ok(())
    }

    pub fn login_history(&self, username: &str) -> Result<Vec<LoginRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT username, login_time
            FROM login_history
            WHERE username = ?1
            ORDER BY login_time DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![username], |row| {
            Ok(LoginRecord {
                username: row.get(0)?,
                login_time: row.get(1)?,
            })
        })?;

        let mut logins = Vec::new();
        for row in rows {
            logins.push(row?);
        }
        Ok(logins)
    }

    pub fn record_summary(
        &self,
        summary: &UsageSummary,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO summary_history (
                pi_name,
                timestamp,
                number_of_users,
                total_usage,
                usage_average,
                max_individual_usage
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                summary.pi,
                format_timestamp(at),
                summary.number_of_users as i64,
                summary.total_usage as i64,
                summary.usage_average,
                summary.max_individual_usage as i64,
            ],
        )?;
        Ok(())
    }

    /// Newest first. `None` returns every PI's history.
    pub fn summary_history(&self, pi_name: Option<&str>) -> Result<Vec<SummaryRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT pi_name, timestamp, number_of_users, total_usage, usage_average, max_individual_usage
            FROM summary_history
            WHERE ?1 IS NULL OR pi_name = ?1
            ORDER BY timestamp DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![pi_name], |row| {
            Ok(SummaryRecord {
                pi_name: row.get(0)?,
                timestamp: row.get(1)?,
                number_of_users: row.get::<_, i64>(2)? as u64,
                total_usage: row.get::<_, i64>(3)? as u64,
                usage_average: row.get(4)?,
                max_individual_usage: row.get::<_, i64>(5)? as u64,
            })
        })?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        hashed_password: row.get(3)?,
        disabled: row.get::<_, i64>(4)? != 0,
        last_login: row.get(5)?,
        is_admin: row.get::<_, i64>(6)? != 0,
    })
}

fn quota_from_row(row: &Row<'_>) -> rusqlite::Result<QuotaRecord> {
    Ok(QuotaRecord {
        quota_id: row.get(0)?,
        pi_name: row.get(1)?,
        student_name: row.get(2)?,
        usage: row.get::<_, i64>(3)?.max(0) as u64,
        soft_limit: row.get::<_, i64>(4)?.max(0) as u64,
        hard_limit: row.get::<_, i64>(5)?.max(0) as u64,
        files: row.get::<_, i64>(6)?.max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn open() -> (TempDir, QuotaDatabase) {
        let dir = TempDir::new().expect("tempdir");
        let db = QuotaDatabase::new(dir.path()).expect("open database");
        (dir, db)
    }

    fn quota(pi: &str, member: &str, usage: u64) -> NewQuota {
        NewQuota {
            pi_name: pi.to_string(),
            student_name: member.to_string(),
            usage,
            soft_limit: 20,
            hard_limit: 25,
            files: 3,
        }
    }

    #[test]
    fn users_round_trip_through_lookup() {
        let (_dir, db) = open();
        db.insert_user(&NewUser {
            username: "carol".into(),
            email: "carol@example.com".into(),
            hashed_password: "hash".into(),
            is_admin: true,
        })
        .unwrap();

        let user = db.find_user("carol").unwrap().expect("user exists");
        assert_eq!(user.email, "carol@example.com");
        assert!(user.is_admin);
        assert!(!user.disabled);
        assert!(user.last_login.is_none());
        assert!(db.find_user("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let (_dir, db) = open();
        let user = NewUser {
            username: "dup".into(),
            email: "dup@example.com".into(),
            hashed_password: "hash".into(),
            is_admin: false,
        };
        db.insert_user(&user).unwrap();
        assert!(matches!(
            db.insert_user(&user),
            Err(StorageError::DatabaseError(_))
        ));
    }

    #[test]
    fn quotas_are_filtered_by_pi() {
        let (_dir, db) = open();
        db.insert_quota(&quota("amy", "tom", 1)).unwrap();
        db.insert_quota(&quota("bob", "alice", 5)).unwrap();
        db.insert_quota(&quota("amy", "mary", 12)).unwrap();

        let amy = db.quotas_for_pi("amy").unwrap();
        let members: Vec<_> = amy.iter().map(|q| q.student_name.as_str()).collect();
        assert_eq!(members, vec!["tom", "mary"]);
        assert_eq!(db.count_quotas().unwrap(), 3);
        assert!(db.quotas_for_pi("zed").unwrap().is_empty());
    }

    #[test]
    fn summary_history_is_newest_first_and_filterable() {
        let (_dir, db) = open();
        let now = Utc::now();
        let summary = |pi: &str, total| UsageSummary {
            pi: pi.to_string(),
            number_of_users: 1,
            total_usage: total,
            usage_average: total as f64,
            max_individual_usage: total,
        };

        db.record_summary(&summary("amy", 1), now - Duration::minutes(2))
            .unwrap();
        db.record_summary(&summary("bob", 2), now - Duration::minutes(1))
            .unwrap();
        db.record_summary(&summary("amy", 3), now).unwrap();

        let all = db.summary_history(None).unwrap();
        let totals: Vec<_> = all.iter().map(|r| r.total_usage).collect();
        assert_eq!(totals, vec![3, 2, 1]);

        let amy = db.summary_history(Some("amy")).unwrap();
        assert_eq!(amy.len(), 2);
        assert!(amy.iter().all(|r| r.pi_name == "amy"));
    }

    #[test]
    fn logins_are_recorded_and_last_login_updated() {
        let (_dir, db) = open();
        db.insert_user(&NewUser {
            username: "amy".into(),
            email: "amy@example.com".into(),
            hashed_password: "hash".into(),
            is_admin: false,
        })
        .unwrap();

        let at = Utc::now();
        db.record_login("amy", at).unwrap();
        db.touch_last_login("amy", at).unwrap();

        assert_eq!(db.login_history("amy").unwrap().len(), 1);
        let user = db.find_user("amy").unwrap().unwrap();
        assert_eq!(user.last_login, Some(format_timestamp(at)));
    }

    #[test]
    fn reopening_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        {
            let db = QuotaDatabase::new(dir.path()).unwrap();
            db.insert_quota(&quota("amy", "tom", 1)).unwrap();
        }
        let db = QuotaDatabase::new(dir.path()).unwrap();
        assert_eq!(db.count_quotas().unwrap(), 1);
    }
}
