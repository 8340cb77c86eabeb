//! SQLite-backed policy store
//!
//! Durability model: one mutex-guarded writer connection plus a small
//! round-robin pool of read-only connections (WAL mode, so readers are
//! never blocked by the writer). Insertion order is realized by the
//! autoincrement rowid; name uniqueness by a UNIQUE constraint, so the
//! check-and-insert is atomic inside SQLite itself.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::core::error::{AuthzError, Result};
use crate::core::policy::{Condition, Policy};
use crate::core::store::PolicyStore;

/// Default number of read connections
const DEFAULT_READ_POOL: usize = 4;

/// Maximum number of read connections
const MAX_READ_POOL: usize = 8;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS policies (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT NOT NULL UNIQUE,
        effect        TEXT NOT NULL CHECK (effect IN ('allow', 'deny')),
        subject_rule  TEXT NOT NULL,
        resource_rule TEXT NOT NULL,
        action        TEXT NOT NULL,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
    );
";

/// Durable [`PolicyStore`] on a single SQLite database file
///
/// # Examples
///
/// ```rust,no_run
/// use turnstile_rs::{Effect, Policy, PolicyStore, SqliteStore};
///
/// let store = SqliteStore::open("policies.db")?;
/// store.insert(&Policy::new("admin-read", Effect::Allow, "role=admin", "type=doc", "read")?)?;
/// # Ok::<(), turnstile_rs::AuthzError>(())
/// ```
pub struct SqliteStore {
    writer: Mutex<Connection>,
    readers: ReadPool,
    /// File-backed stores read through the pool. In-memory stores route
    /// reads through the writer: separate in-memory connections are
    /// isolated databases and would never see the writer's rows.
    use_read_pool: bool,
}

impl SqliteStore {
    /// Open (creating if needed) a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_readers(path, DEFAULT_READ_POOL)
    }

    /// Open a store with an explicit read-pool size (clamped to 1..=8)
    pub fn open_with_readers<P: AsRef<Path>>(path: P, read_pool_size: usize) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening SQLite policy store at {:?}", path);

        let writer = Connection::open(path)?;
        apply_writer_pragmas(&writer)?;
        writer.execute_batch(SCHEMA)?;

        // Readers open after the schema commit so the file is materialized.
        let readers = ReadPool::open(path, read_pool_size)?;

        Ok(SqliteStore {
            writer: Mutex::new(writer),
            readers,
            use_read_pool: true,
        })
    }

    /// Open a private in-memory store (no durability; used by tests)
    pub fn in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite policy store");

        let writer = Connection::open_in_memory()?;
        writer.execute_batch(SCHEMA)?;

        Ok(SqliteStore {
            writer: Mutex::new(writer),
            readers: ReadPool::empty(),
            use_read_pool: false,
        })
    }

    /// Run a read-only query on the best available connection
    fn with_reader<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.use_read_pool {
            self.readers.with_conn(f)
        } else {
            f(&self.writer.lock())
        }
    }
}

impl PolicyStore for SqliteStore {
    fn insert(&self, policy: &Policy) -> Result<()> {
        let conn = self.writer.lock();
        let inserted = conn.execute(
            "INSERT INTO policies (name, effect, subject_rule, resource_rule, action)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                policy.name,
                policy.effect.as_str(),
                policy.subject_rule.rule(),
                policy.resource_rule.rule(),
                policy.action,
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(name = %policy.name, effect = %policy.effect, "Inserted policy");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(AuthzError::DuplicateName {
                name: policy.name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn list_all(&self) -> Result<Vec<Policy>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, effect, subject_rule, resource_rule, action
                 FROM policies ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], row_to_record)?;

            let mut policies = Vec::new();
            for row in rows {
                policies.push(record_to_policy(row?)?);
            }
            Ok(policies)
        })
    }

    fn get(&self, name: &str) -> Result<Option<Policy>> {
        self.with_reader(|conn| {
            let record = conn
                .query_row(
                    "SELECT name, effect, subject_rule, resource_rule, action
                     FROM policies WHERE name = ?1",
                    params![name],
                    row_to_record,
                )
                .optional()?;

            record.map(record_to_policy).transpose()
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_reader(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM policies", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

/// Raw policy row, columns in SELECT order
type Record = (String, String, String, String, String);

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

/// Rehydrate a stored row, re-validating the rule strings
///
/// Rows written through `insert` always parse; a row edited out-of-band
/// surfaces as `MalformedRule`/`UnknownEffect`, never as a silent skip.
fn record_to_policy(record: Record) -> Result<Policy> {
    let (name, effect, subject_rule, resource_rule, action) = record;
    Ok(Policy {
        name,
        effect: effect.parse()?,
        subject_rule: Condition::parse(subject_rule)?,
        resource_rule: Condition::parse(resource_rule)?,
        action,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn apply_writer_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

fn apply_read_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA query_only = ON;
        ",
    )?;
    Ok(())
}

/// Round-robin pool of read-only connections
struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    fn open(path: &Path, pool_size: usize) -> Result<Self> {
        let size = pool_size.clamp(1, MAX_READ_POOL);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            apply_read_pragmas(&conn)?;
            connections.push(Mutex::new(conn));
        }
        Ok(ReadPool {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Pool placeholder for in-memory stores, which never read through it
    fn empty() -> Self {
        ReadPool {
            connections: Vec::new(),
            next: AtomicUsize::new(0),
        }
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        f(&self.connections[idx].lock())
    }
}
