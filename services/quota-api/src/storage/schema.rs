use rusqlite::Connection;

pub const USERS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    hashed_password TEXT NOT NULL,
    disabled INTEGER NOT NULL DEFAULT 0,
    last_login TEXT,
    is_admin INTEGER NOT NULL DEFAULT 0
);
"#;

pub const QUOTAS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS quotas (
    quota_id INTEGER PRIMARY KEY AUTOINCREMENT,
    pi_name TEXT NOT NULL,
    student_name TEXT NOT NULL,
    usage INTEGER NOT NULL DEFAULT 0,
    soft_limit INTEGER NOT NULL DEFAULT 0,
    hard_limit INTEGER NOT NULL DEFAULT 0,
    files INTEGER NOT NULL DEFAULT 0
);
"#;

pub const LOGIN_HISTORY_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS login_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    login_time TEXT NOT NULL
);
"#;

pub const SUMMARY_HISTORY_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS summary_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pi_name TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    number_of_users INTEGER NOT NULL,
    total_usage INTEGER NOT NULL,
    usage_average REAL NOT NULL,
    max_individual_usage INTEGER NOT NULL
);
"#;

pub const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_quotas_pi ON quotas(pi_name);
CREATE INDEX IF NOT EXISTS idx_login_history_user ON login_history(username);
CREATE INDEX IF NOT EXISTS idx_summary_history_pi_time ON summary_history(pi_name, timestamp);
"#;

pub fn init_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(USERS_TABLE_SCHEMA)?;
    conn.execute_batch(QUOTAS_TABLE_SCHEMA)?;
    conn.execute_batch(LOGIN_HISTORY_TABLE_SCHEMA)?;
    conn.execute_batch(SUMMARY_HISTORY_TABLE_SCHEMA)?;
    conn.execute_batch(INDEXES)?;
    Ok(())
}
