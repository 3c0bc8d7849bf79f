use tracing::info;

use crate::auth::hash_password;

use super::database::{NewQuota, NewUser, QuotaDatabase};
use super::error::StorageError;

struct DemoUser {
    username: &'static str,
    email: &'static str,
    password: &'static str,
    is_admin: bool,
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "amy",
        email: "amy@example.com",
        password: "password123",
        is_admin: false,
    },
    DemoUser {
        username: "bob",
        email: "bob@example.com",
        password: "securepass",
        is_admin: false,
    },
    DemoUser {
        username: "admin",
        email: "admin@example.com",
        password: "adminpass",
        is_admin: true,
    },
];

// (pi, member, usage, soft, hard, files)
const DEMO_QUOTAS: &[(&str, &str, u64, u64, u64, u64)] = &[
    ("amy", "tom", 1, 20, 25, 13),
    ("amy", "amy", 3, 20, 25, 13),
    ("amy", "mary", 12, 20, 25, 1401),
    ("bob", "alice", 5, 15, 30, 8),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_inserted: usize,
    pub quotas_inserted: usize,
}

/// Users are added when their username is missing; quota rows only when the
/// quotas table is empty.
pub fn seed_demo_data(db: &QuotaDatabase, bcrypt_cost: u32) -> Result<SeedReport, StorageError> {
    let mut report = SeedReport::default();

    for user in DEMO_USERS {
        if db.find_user(user.username)?.is_some() {
            continue;
        }
        db.insert_user(&NewUser {
            username: user.username.to_string(),
            email: user.email.to_string(),
            hashed_password: hash_password(user.password, bcrypt_cost)?,
            is_admin: user.is_admin,
        })?;
        report.users_inserted += 1;
    }

    if db.count_quotas()? == 0 {
        for &(pi, member, usage, soft, hard, files) in DEMO_QUOTAS {
            db.insert_quota(&NewQuota {
                pi_name: pi.to_string(),
                student_name: member.to_string(),
                usage,
                soft_limit: soft,
                hard_limit: hard,
                files,
            })?;
            report.quotas_inserted += 1;
        }
    }

    info!(
        users_inserted = report.users_inserted,
        quotas_inserted = report.quotas_inserted,
        "seeded demo data"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::auth::verify_password;

    #[test]
    fn seeding_twice_does_not_duplicate_rows() {
        let dir = TempDir::new().unwrap();
        let db = QuotaDatabase::new(dir.path()).unwrap();

        let first = seed_demo_data(&db, 4).unwrap();
        assert_eq!(first.users_inserted, 3);
        assert_eq!(first.quotas_inserted, 4);

        let second = seed_demo_data(&db, 4).unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(db.list_users().unwrap().len(), 3);
        assert_eq!(db.count_quotas().unwrap(), 4);
    }

    #[test]
    fn seeded_passwords_are_hashed() {
        let dir = TempDir::new().unwrap();
        let db = QuotaDatabase::new(dir.path()).unwrap();
        seed_demo_data(&db, 4).unwrap();

        let admin = db.find_user("admin").unwrap().unwrap();
        assert!(admin.is_admin);
        assert_ne!(admin.hashed_password, "adminpass");
        assert!(verify_password("adminpass", &admin.hashed_password).unwrap());
    }
}
