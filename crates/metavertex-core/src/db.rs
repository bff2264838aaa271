// SQLite persistence for users, products and every mediated record.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::audit::AdminAction;
use crate::model::document::{Document, ScanResult};
use crate::model::interest::{Interest, PrimaryIntent};
use crate::model::meeting::{Meeting, MeetingStatus};
use crate::model::product::Product;
use crate::model::query::FounderQuery;
use crate::model::request::{ContactMethod, Request, RequestKind, RequestStatus};
use crate::model::user::{format_unique_id, ProfileUpdate, User, UserType};
use crate::model::ReviewStatus;

/// SQLite-backed store for every marketplace record.
pub struct Database {
    conn: Mutex<Connection>,
}

const USER_COLUMNS: &str = "id, email, name, user_type, unique_id, status, company, phone, \
     basic_info, created_at, last_active, is_active";

const PRODUCT_COLUMNS: &str = "id, founder_id, founder_unique_id, product_name, category, \
     description, problem, solution, benefits, funding_required, current_stage, status, \
     submitted_at, views, interests, image, detailed_info, admin_notes";

const INTEREST_COLUMNS: &str = "id, investor_id, product_id, primary_intent, areas_of_interest, \
     specific_questions, message, admin_text, status, created_at, reviewed_at, reviewed_by";

const REQUEST_COLUMNS: &str = "id, from_user_id, to_user_id, product_id, kind, message, \
     contact_method, status, created_at, updated_at, admin_notes";

const QUERY_COLUMNS: &str = "id, founder_id, investor_id, product_id, questions, \
     specific_questions, admin_text, status, created_at, reviewed_at, reviewed_by";

const MEETING_COLUMNS: &str = "id, meeting_id, title, description, duration_minutes, \
     scheduled_at, kind, organizer_id, organizer_unique_id, participant_ids, join_url, \
     passcode, status, created_at";

const DOCUMENT_COLUMNS: &str =
    "id, product_id, uploader_id, name, size, content_type, sha256, scan, uploaded_at";

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE,
                name          TEXT NOT NULL,
                user_type     TEXT NOT NULL,
                unique_id     TEXT NOT NULL UNIQUE,
                status        TEXT NOT NULL,
                company       TEXT NOT NULL DEFAULT '',
                phone         TEXT NOT NULL DEFAULT '',
                basic_info    TEXT NOT NULL DEFAULT '{}',
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                last_active   TEXT NOT NULL,
                is_active     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS products (
                id                TEXT PRIMARY KEY,
                founder_id        TEXT NOT NULL REFERENCES users(id),
                founder_unique_id TEXT NOT NULL,
                product_name      TEXT NOT NULL,
                category          TEXT NOT NULL,
                description       TEXT NOT NULL,
                problem           TEXT NOT NULL,
                solution          TEXT NOT NULL,
                benefits          TEXT NOT NULL DEFAULT '[]',
                funding_required  INTEGER NOT NULL,
                current_stage     TEXT NOT NULL,
                status            TEXT NOT NULL,
                submitted_at      TEXT NOT NULL,
                views             INTEGER NOT NULL DEFAULT 0,
                interests         INTEGER NOT NULL DEFAULT 0,
                image             TEXT,
                detailed_info     TEXT,
                admin_notes       TEXT
            );

            CREATE TABLE IF NOT EXISTS interests (
                id                 TEXT PRIMARY KEY,
                investor_id        TEXT NOT NULL REFERENCES users(id),
                product_id         TEXT NOT NULL REFERENCES products(id),
                primary_intent     TEXT NOT NULL,
                areas_of_interest  TEXT NOT NULL,
                specific_questions TEXT NOT NULL DEFAULT '',
                message            TEXT NOT NULL,
                admin_text         TEXT,
                status             TEXT NOT NULL,
                created_at         TEXT NOT NULL,
                reviewed_at        TEXT,
                reviewed_by        TEXT,
                UNIQUE(investor_id, product_id)
            );

            CREATE TABLE IF NOT EXISTS requests (
                id             TEXT PRIMARY KEY,
                from_user_id   TEXT NOT NULL REFERENCES users(id),
                to_user_id     TEXT NOT NULL REFERENCES users(id),
                product_id     TEXT REFERENCES products(id),
                kind           TEXT NOT NULL,
                message        TEXT NOT NULL,
                contact_method TEXT NOT NULL,
                status         TEXT NOT NULL,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL,
                admin_notes    TEXT
            );

            CREATE TABLE IF NOT EXISTS founder_queries (
                id                 TEXT PRIMARY KEY,
                founder_id         TEXT NOT NULL REFERENCES users(id),
                investor_id        TEXT NOT NULL REFERENCES users(id),
                product_id         TEXT NOT NULL REFERENCES products(id),
                questions          TEXT NOT NULL,
                specific_questions TEXT NOT NULL DEFAULT '',
                admin_text         TEXT,
                status             TEXT NOT NULL,
                created_at         TEXT NOT NULL,
                reviewed_at        TEXT,
                reviewed_by        TEXT
            );

            CREATE TABLE IF NOT EXISTS meetings (
                id                  TEXT PRIMARY KEY,
                meeting_id          TEXT NOT NULL,
                title               TEXT NOT NULL,
                description         TEXT NOT NULL DEFAULT '',
                duration_minutes    INTEGER NOT NULL,
                scheduled_at        TEXT NOT NULL,
                kind                TEXT NOT NULL,
                organizer_id        TEXT NOT NULL REFERENCES users(id),
                organizer_unique_id TEXT NOT NULL,
                participant_ids     TEXT NOT NULL DEFAULT '[]',
                join_url            TEXT NOT NULL,
                passcode            TEXT NOT NULL,
                status              TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                id           TEXT PRIMARY KEY,
                product_id   TEXT NOT NULL REFERENCES products(id),
                uploader_id  TEXT NOT NULL REFERENCES users(id),
                name         TEXT NOT NULL,
                size         INTEGER NOT NULL,
                content_type TEXT NOT NULL,
                sha256       TEXT NOT NULL,
                scan         TEXT NOT NULL,
                uploaded_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS admin_actions (
                id        TEXT PRIMARY KEY,
                action    TEXT NOT NULL,
                actor_id  TEXT NOT NULL,
                target_id TEXT,
                details   TEXT NOT NULL DEFAULT '{}',
                timestamp TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_products_founder ON products(founder_id);
             CREATE INDEX IF NOT EXISTS idx_interests_product ON interests(product_id);
             CREATE INDEX IF NOT EXISTS idx_requests_parties ON requests(from_user_id, to_user_id);
             CREATE INDEX IF NOT EXISTS idx_documents_product ON documents(product_id);",
        )
        .context("failed to create indexes")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert a new user, allocating its `unique_id` from the number of
    /// existing users of the same type inside one transaction. The
    /// `unique_id` on `user` is ignored. Returns `None` if the email is
    /// already registered.
    pub fn insert_user(&self, user: &User, password_hash: &str) -> Result<Option<User>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin user transaction")?;

        let taken: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                params![user.email],
                |row| row.get(0),
            )
            .context("failed to check email uniqueness")?;
        if taken {
            return Ok(None);
        }

        let same_type: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM users WHERE user_type = ?1",
                params![user.user_type.as_str()],
                |row| row.get(0),
            )
            .context("failed to count users by type")?;

        let mut created = user.clone();
        created.unique_id = format_unique_id(user.user_type, same_type as usize + 1);

        tx.execute(
            "INSERT INTO users
                (id, email, name, user_type, unique_id, status, company, phone, basic_info,
                 password_hash, created_at, last_active, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                created.id,
                created.email,
                created.name,
                created.user_type.as_str(),
                created.unique_id,
                created.status.as_str(),
                created.company,
                created.phone,
                to_json(&created.basic_info)?,
                password_hash,
                created.created_at,
                created.last_active,
                created.is_active,
            ],
        )
        .context("failed to insert user")?;

        tx.commit().context("failed to commit user insert")?;
        Ok(Some(created))
    }

    pub fn find_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .context("failed to load user")
    }

    /// Look up a user by email along with the stored password hash.
    pub fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
            params![email],
            |row| Ok((user_from_row(row)?, row.get(12)?)),
        )
        .optional()
        .context("failed to load credentials")
    }

    pub fn list_users(
        &self,
        status: Option<ReviewStatus>,
        user_type: Option<UserType>,
    ) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR user_type = ?2)
                 ORDER BY created_at"
            ))
            .context("failed to prepare list_users query")?;
        let users = stmt
            .query_map(
                params![status.map(|s| s.as_str()), user_type.map(|t| t.as_str())],
                user_from_row,
            )
            .context("failed to query users")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map user rows")?;
        Ok(users)
    }

    /// Set a user's review status. Returns `false` if no such user exists.
    pub fn set_user_status(&self, id: &str, status: ReviewStatus) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE users SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )
            .context("failed to update user status")?;
        Ok(changed == 1)
    }

    /// Record presence: `last_active` is bumped whenever the flag changes.
    pub fn set_user_active(&self, id: &str, active: bool, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE users SET is_active = ?2, last_active = ?3 WHERE id = ?1",
            params![id, active, at],
        )
        .context("failed to update user activity")?;
        Ok(())
    }

    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<()> {
        let conn = self.conn();
        let basic_info = update.basic_info.as_ref().map(to_json).transpose()?;
        conn.execute(
            "UPDATE users SET
                name       = COALESCE(?2, name),
                company    = COALESCE(?3, company),
                phone      = COALESCE(?4, phone),
                basic_info = COALESCE(?5, basic_info)
             WHERE id = ?1",
            params![id, update.name, update.company, update.phone, basic_info],
        )
        .context("failed to update profile")?;
        Ok(())
    }

    pub fn count_users(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("failed to count users")?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub fn insert_product(&self, product: &Product) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO products ({PRODUCT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ),
            params![
                product.id,
                product.founder_id,
                product.founder_unique_id,
                product.product_name,
                product.category,
                product.description,
                product.problem,
                product.solution,
                to_json(&product.benefits)?,
                sql_int(product.funding_required, "funding_required")?,
                product.current_stage,
                product.status.as_str(),
                product.submitted_at,
                sql_int(product.views, "views")?,
                sql_int(product.interests, "interests")?,
                product.image,
                product.detailed_info.as_ref().map(to_json).transpose()?,
                product.admin_notes,
            ],
        )
        .context("failed to insert product")?;
        Ok(())
    }

    pub fn find_product(&self, id: &str) -> Result<Option<Product>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            params![id],
            product_from_row,
        )
        .optional()
        .context("failed to load product")
    }

    /// All products, newest first, optionally restricted to one founder.
    pub fn list_products(&self, founder_id: Option<&str>) -> Result<Vec<Product>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products
                 WHERE (?1 IS NULL OR founder_id = ?1)
                 ORDER BY submitted_at DESC"
            ))
            .context("failed to prepare list_products query")?;
        let products = stmt
            .query_map(params![founder_id], product_from_row)
            .context("failed to query products")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map product rows")?;
        Ok(products)
    }

    pub fn set_product_status(
        &self,
        id: &str,
        status: ReviewStatus,
        notes: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE products SET status = ?2, admin_notes = COALESCE(?3, admin_notes)
                 WHERE id = ?1",
                params![id, status.as_str(), notes],
            )
            .context("failed to update product status")?;
        Ok(changed == 1)
    }

    pub fn increment_product_views(&self, id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE products SET views = views + 1 WHERE id = ?1",
            params![id],
        )
        .context("failed to increment product views")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interests
    // ------------------------------------------------------------------

    /// Insert an interest and bump the product's interest counter in the same
    /// transaction. Returns `false` (and changes nothing) if the investor has
    /// already expressed interest in the product.
    pub fn insert_interest(&self, interest: &Interest) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin interest transaction")?;

        let inserted = tx
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO interests ({INTEREST_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    interest.id,
                    interest.investor_id,
                    interest.product_id,
                    interest.primary_intent.as_str(),
                    to_json(&interest.areas_of_interest)?,
                    interest.specific_questions,
                    interest.message,
                    interest.admin_text,
                    interest.status.as_str(),
                    interest.created_at,
                    interest.reviewed_at,
                    interest.reviewed_by,
                ],
            )
            .context("failed to insert interest")?;

        if inserted == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE products SET interests = interests + 1 WHERE id = ?1",
            params![interest.product_id],
        )
        .context("failed to increment product interests")?;

        tx.commit().context("failed to commit interest")?;
        Ok(true)
    }

    pub fn find_interest(&self, id: &str) -> Result<Option<Interest>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {INTEREST_COLUMNS} FROM interests WHERE id = ?1"),
            params![id],
            interest_from_row,
        )
        .optional()
        .context("failed to load interest")
    }

    pub fn interest_exists(&self, investor_id: &str, product_id: &str) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM interests WHERE investor_id = ?1 AND product_id = ?2)",
            params![investor_id, product_id],
            |row| row.get(0),
        )
        .context("failed to check interest existence")
    }

    pub fn list_interests(&self) -> Result<Vec<Interest>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {INTEREST_COLUMNS} FROM interests ORDER BY created_at DESC"
            ))
            .context("failed to prepare list_interests query")?;
        let interests = stmt
            .query_map([], interest_from_row)
            .context("failed to query interests")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map interest rows")?;
        Ok(interests)
    }

    /// Persist the reviewable fields of an interest.
    pub fn update_interest_review(&self, interest: &Interest) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE interests SET
                primary_intent = ?2, areas_of_interest = ?3, message = ?4, admin_text = ?5,
                status = ?6, reviewed_at = ?7, reviewed_by = ?8
             WHERE id = ?1",
            params![
                interest.id,
                interest.primary_intent.as_str(),
                to_json(&interest.areas_of_interest)?,
                interest.message,
                interest.admin_text,
                interest.status.as_str(),
                interest.reviewed_at,
                interest.reviewed_by,
            ],
        )
        .context("failed to update interest review")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    pub fn insert_request(&self, request: &Request) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO requests ({REQUEST_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                request.id,
                request.from_user_id,
                request.to_user_id,
                request.product_id,
                request.kind.as_str(),
                request.message,
                request.contact_method.as_str(),
                request.status.as_str(),
                request.created_at,
                request.updated_at,
                request.admin_notes,
            ],
        )
        .context("failed to insert request")?;
        Ok(())
    }

    pub fn find_request(&self, id: &str) -> Result<Option<Request>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1"),
            params![id],
            request_from_row,
        )
        .optional()
        .context("failed to load request")
    }

    /// Requests newest first; with `party`, only those it sent or received.
    pub fn list_requests(&self, party: Option<&str>) -> Result<Vec<Request>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM requests
                 WHERE (?1 IS NULL OR from_user_id = ?1 OR to_user_id = ?1)
                 ORDER BY created_at DESC"
            ))
            .context("failed to prepare list_requests query")?;
        let requests = stmt
            .query_map(params![party], request_from_row)
            .context("failed to query requests")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map request rows")?;
        Ok(requests)
    }

    /// Update exactly one request's status, touching no other row.
    pub fn set_request_status(
        &self,
        id: &str,
        status: RequestStatus,
        admin_notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE requests SET status = ?2, admin_notes = COALESCE(?3, admin_notes),
                    updated_at = ?4
                 WHERE id = ?1",
                params![id, status.as_str(), admin_notes, at],
            )
            .context("failed to update request status")?;
        Ok(changed == 1)
    }

    // ------------------------------------------------------------------
    // Founder queries
    // ------------------------------------------------------------------

    pub fn insert_query(&self, query: &FounderQuery) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO founder_queries ({QUERY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                query.id,
                query.founder_id,
                query.investor_id,
                query.product_id,
                to_json(&query.questions)?,
                query.specific_questions,
                query.admin_text,
                query.status.as_str(),
                query.created_at,
                query.reviewed_at,
                query.reviewed_by,
            ],
        )
        .context("failed to insert founder query")?;
        Ok(())
    }

    pub fn find_query(&self, id: &str) -> Result<Option<FounderQuery>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {QUERY_COLUMNS} FROM founder_queries WHERE id = ?1"),
            params![id],
            query_from_row,
        )
        .optional()
        .context("failed to load founder query")
    }

    pub fn list_queries(&self) -> Result<Vec<FounderQuery>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {QUERY_COLUMNS} FROM founder_queries ORDER BY created_at DESC"
            ))
            .context("failed to prepare list_queries query")?;
        let queries = stmt
            .query_map([], query_from_row)
            .context("failed to query founder queries")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map founder query rows")?;
        Ok(queries)
    }

    pub fn update_query_review(&self, query: &FounderQuery) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE founder_queries SET
                questions = ?2, admin_text = ?3, status = ?4, reviewed_at = ?5, reviewed_by = ?6
             WHERE id = ?1",
            params![
                query.id,
                to_json(&query.questions)?,
                query.admin_text,
                query.status.as_str(),
                query.reviewed_at,
                query.reviewed_by,
            ],
        )
        .context("failed to update founder query review")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Meetings
    // ------------------------------------------------------------------

    pub fn insert_meeting(&self, meeting: &Meeting) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO meetings ({MEETING_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                meeting.id,
                meeting.meeting_id,
                meeting.title,
                meeting.description,
                meeting.duration_minutes,
                meeting.scheduled_at,
                meeting.kind,
                meeting.organizer_id,
                meeting.organizer_unique_id,
                to_json(&meeting.participant_ids)?,
                meeting.join_url,
                meeting.passcode,
                meeting.status.as_str(),
                meeting.created_at,
            ],
        )
        .context("failed to insert meeting")?;
        Ok(())
    }

    pub fn find_meeting(&self, id: &str) -> Result<Option<Meeting>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"),
            params![id],
            meeting_from_row,
        )
        .optional()
        .context("failed to load meeting")
    }

    /// Meetings in chronological order of their scheduled start.
    pub fn list_meetings(&self) -> Result<Vec<Meeting>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEETING_COLUMNS} FROM meetings ORDER BY scheduled_at"
            ))
            .context("failed to prepare list_meetings query")?;
        let meetings = stmt
            .query_map([], meeting_from_row)
            .context("failed to query meetings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map meeting rows")?;
        Ok(meetings)
    }

    pub fn set_meeting_status(&self, id: &str, status: MeetingStatus) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE meetings SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )
            .context("failed to update meeting status")?;
        Ok(changed == 1)
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Insert a document unless its product already holds `max_per_product`.
    /// The count and the insert share one transaction, so concurrent uploads
    /// cannot overshoot the cap. Returns `false` when the cap was reached.
    pub fn insert_document(&self, doc: &Document, max_per_product: usize) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin document transaction")?;

        let existing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE product_id = ?1",
                params![doc.product_id],
                |row| row.get(0),
            )
            .context("failed to count documents")?;
        if existing as usize >= max_per_product {
            return Ok(false);
        }

        tx.execute(
            &format!(
                "INSERT INTO documents ({DOCUMENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                doc.id,
                doc.product_id,
                doc.uploader_id,
                doc.name,
                sql_int(doc.size, "size")?,
                doc.content_type,
                doc.sha256,
                scan_str(doc.scan),
                doc.uploaded_at,
            ],
        )
        .context("failed to insert document")?;

        tx.commit().context("failed to commit document")?;
        Ok(true)
    }

    pub fn find_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
            params![id],
            document_from_row,
        )
        .optional()
        .context("failed to load document")
    }

    pub fn list_documents(&self, product_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE product_id = ?1
                 ORDER BY uploaded_at"
            ))
            .context("failed to prepare list_documents query")?;
        let docs = stmt
            .query_map(params![product_id], document_from_row)
            .context("failed to query documents")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map document rows")?;
        Ok(docs)
    }

    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])
            .context("failed to delete document")?;
        Ok(changed == 1)
    }

    // ------------------------------------------------------------------
    // Admin action log
    // ------------------------------------------------------------------

    pub fn record_action(&self, action: &AdminAction) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO admin_actions (id, action, actor_id, target_id, details, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                action.id,
                action.action,
                action.actor_id,
                action.target_id,
                to_json(&action.details)?,
                action.timestamp,
            ],
        )
        .context("failed to record admin action")?;
        Ok(())
    }

    /// Most recent admin actions first.
    pub fn recent_actions(&self, limit: usize) -> Result<Vec<AdminAction>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, action, actor_id, target_id, details, timestamp
                 FROM admin_actions ORDER BY timestamp DESC LIMIT ?1",
            )
            .context("failed to prepare recent_actions query")?;
        let actions = stmt
            .query_map(params![limit as i64], |row| {
                Ok(AdminAction {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    actor_id: row.get(2)?,
                    target_id: row.get(3)?,
                    details: json_col(row, 4)?,
                    timestamp: row.get(5)?,
                })
            })
            .context("failed to query admin actions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map admin action rows")?;
        Ok(actions)
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to serialize column value")
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognised value `{0}`")]
struct UnknownValue(String);

/// Read a text column through one of the model `parse` functions.
fn enum_col<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, UnknownValue(raw)))
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn opt_json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn count_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|e| conversion_error(idx, e))
}

/// SQLite integers are signed; refuse values that would wrap.
fn sql_int(value: u64, column: &str) -> anyhow::Result<i64> {
    i64::try_from(value).with_context(|| format!("{column} out of range: {value}"))
}

fn scan_str(scan: ScanResult) -> &'static str {
    match scan {
        ScanResult::Clean => "clean",
        ScanResult::Threat => "threat",
    }
}

fn parse_scan(s: &str) -> Option<ScanResult> {
    match s {
        "clean" => Some(ScanResult::Clean),
        "threat" => Some(ScanResult::Threat),
        _ => None,
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        user_type: enum_col(row, 3, UserType::parse)?,
        unique_id: row.get(4)?,
        status: enum_col(row, 5, ReviewStatus::parse)?,
        company: row.get(6)?,
        phone: row.get(7)?,
        basic_info: json_col(row, 8)?,
        created_at: row.get(9)?,
        last_active: row.get(10)?,
        is_active: row.get(11)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        founder_id: row.get(1)?,
        founder_unique_id: row.get(2)?,
        product_name: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        problem: row.get(6)?,
        solution: row.get(7)?,
        benefits: json_col(row, 8)?,
        funding_required: count_col(row, 9)?,
        current_stage: row.get(10)?,
        status: enum_col(row, 11, ReviewStatus::parse)?,
        submitted_at: row.get(12)?,
        views: count_col(row, 13)?,
        interests: count_col(row, 14)?,
        image: row.get(15)?,
        detailed_info: opt_json_col(row, 16)?,
        admin_notes: row.get(17)?,
    })
}

fn interest_from_row(row: &Row<'_>) -> rusqlite::Result<Interest> {
    Ok(Interest {
        id: row.get(0)?,
        investor_id: row.get(1)?,
        product_id: row.get(2)?,
        primary_intent: enum_col(row, 3, PrimaryIntent::parse)?,
        areas_of_interest: json_col(row, 4)?,
        specific_questions: row.get(5)?,
        message: row.get(6)?,
        admin_text: row.get(7)?,
        status: enum_col(row, 8, ReviewStatus::parse)?,
        created_at: row.get(9)?,
        reviewed_at: row.get(10)?,
        reviewed_by: row.get(11)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<Request> {
    Ok(Request {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        product_id: row.get(3)?,
        kind: enum_col(row, 4, RequestKind::parse)?,
        message: row.get(5)?,
        contact_method: enum_col(row, 6, ContactMethod::parse)?,
        status: enum_col(row, 7, RequestStatus::parse)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        admin_notes: row.get(10)?,
    })
}

fn query_from_row(row: &Row<'_>) -> rusqlite::Result<FounderQuery> {
    Ok(FounderQuery {
        id: row.get(0)?,
        founder_id: row.get(1)?,
        investor_id: row.get(2)?,
        product_id: row.get(3)?,
        questions: json_col(row, 4)?,
        specific_questions: row.get(5)?,
        admin_text: row.get(6)?,
        status: enum_col(row, 7, ReviewStatus::parse)?,
        created_at: row.get(8)?,
        reviewed_at: row.get(9)?,
        reviewed_by: row.get(10)?,
    })
}

fn meeting_from_row(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: row.get(0)?,
        meeting_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        duration_minutes: row.get(4)?,
        scheduled_at: row.get(5)?,
        kind: row.get(6)?,
        organizer_id: row.get(7)?,
        organizer_unique_id: row.get(8)?,
        participant_ids: json_col(row, 9)?,
        join_url: row.get(10)?,
        passcode: row.get(11)?,
        status: enum_col(row, 12, MeetingStatus::parse)?,
        created_at: row.get(13)?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        product_id: row.get(1)?,
        uploader_id: row.get(2)?,
        name: row.get(3)?,
        size: count_col(row, 4)?,
        content_type: row.get(5)?,
        sha256: row.get(6)?,
        scan: enum_col(row, 7, parse_scan)?,
        uploaded_at: row.get(8)?,
    })
}
