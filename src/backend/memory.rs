//! In-memory backend
//!
//! Evaluates queries against JSON rows held in memory. Stored procedures,
//! users and failures are scripted by the caller, so services can be tested
//! without a running backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use super::{AuthEvent, AuthState, Backend, Filter, FilterOp, Query, StoredObject, UploadOptions};
use crate::error::{Result, SdkError};
use crate::models::{AuthUser, OAuthProvider, Session};

/// An object written through `upload`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bucket: String,
    pub path: String,
    pub body: Vec<u8>,
    pub options: UploadOptions,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    procedures: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
    users: Mutex<HashMap<String, AuthUser>>,
    current: Mutex<Option<AuthUser>>,
    uploads: Mutex<Vec<Upload>>,
    failures: Mutex<HashMap<String, String>>,
    auth: AuthState,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// Script the result of a stored procedure
    pub fn set_rpc_result(&self, function: &str, result: Value) {
        lock(&self.procedures).insert(function.to_string(), result);
    }

    /// Stored procedure calls in order, with their parameters
    pub fn rpc_calls(&self) -> Vec<(String, Value)> {
        lock(&self.calls).clone()
    }

    /// Accept `access_token` as belonging to `user`
    pub fn register_user(&self, access_token: &str, user: AuthUser) {
        lock(&self.users).insert(access_token.to_string(), user);
    }

    /// Sign `user` in directly
    pub fn sign_in(&self, user: AuthUser) {
        let session = Session::new(format!("memory-token-{}", user.id), None);
        *lock(&self.current) = Some(user.clone());
        self.auth.emit(AuthEvent::SignedIn { session, user });
    }

    pub fn uploads(&self) -> Vec<Upload> {
        lock(&self.uploads).clone()
    }

    /// Make an operation fail with a remote error.
    ///
    /// Operations are named `select:<table>`, `count:<table>`, `insert:<table>`,
    /// `update:<table>`, `delete:<table>`, `upsert:<table>`, `rpc:<function>`,
    /// `current_user`, `sign_out`, `update_user` and `upload`.
    pub fn fail(&self, operation: &str, message: &str) {
        lock(&self.failures).insert(operation.to_string(), message.to_string());
    }

    fn check_failure(&self, operation: &str) -> Result<()> {
        match lock(&self.failures).get(operation) {
            Some(message) => Err(SdkError::remote(message.clone())),
            None => Ok(()),
        }
    }

    fn matching(&self, query: &Query) -> Vec<Value> {
        lock(&self.tables)
            .get(query.table_name())
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters().iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn project(&self, row: &Value, columns: &str) -> Value {
        let mut out = Map::new();
        for item in split_columns(columns) {
            if item == "*" {
                if let Some(fields) = row.as_object() {
                    out.extend(fields.clone());
                }
            } else if let Some(open) = item.find('(') {
                let (alias, table) = match item[..open].split_once(':') {
                    Some((alias, table)) => (alias.trim(), table.trim()),
                    None => (item[..open].trim(), item[..open].trim()),
                };
                let inner = item[open + 1..].trim_end_matches(')');
                let embedded = self
                    .related(row, alias, table)
                    .map(|related| self.project(&related, inner))
                    .unwrap_or(Value::Null);
                out.insert(alias.to_string(), embedded);
            } else if let Some(value) = row.get(item) {
                out.insert(item.to_string(), value.clone());
            }
        }
        Value::Object(out)
    }

    /// Row of `table` referenced by `row`, through `<alias>_id`, `<table>_id` or a shared `id`
    fn related(&self, row: &Value, alias: &str, table: &str) -> Option<Value> {
        let key = [format!("{}_id", alias), format!("{}_id", table), "id".to_string()]
            .iter()
            .find_map(|column| row.get(column).filter(|v| !v.is_null()).cloned())?;
        lock(&self.tables)
            .get(table)?
            .iter()
            .find(|candidate| candidate.get("id") == Some(&key))
            .cloned()
    }

    fn store(&self, table: &str, rows: Value, merge: bool) -> Vec<Value> {
        let incoming = match rows {
            Value::Array(rows) => rows,
            row => vec![row],
        };
        let mut tables = lock(&self.tables);
        let stored = tables.entry(table.to_string()).or_default();
        let mut written = Vec::with_capacity(incoming.len());

        for mut row in incoming {
            if let Some(fields) = row.as_object_mut() {
                fields
                    .entry("id")
                    .or_insert_with(|| json!(uuid::Uuid::new_v4().to_string()));
            }

            let existing = if merge {
                stored.iter().position(|r| r.get("id") == row.get("id"))
            } else {
                None
            };
            match existing {
                Some(index) => {
                    merge_into(&mut stored[index], &row);
                    written.push(stored[index].clone());
                }
                None => {
                    if let Some(fields) = row.as_object_mut() {
                        fields
                            .entry("created_at")
                            .or_insert_with(|| json!(Utc::now().to_rfc3339()));
                    }
                    stored.push(row.clone());
                    written.push(row);
                }
            }
        }
        written
    }
}

fn merge_into(target: &mut Value, changes: &Value) {
    if let (Some(target), Some(changes)) = (target.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Split a select list on top-level commas
fn split_columns(columns: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in columns.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(columns[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(columns[start..].trim());
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Compare as timestamps, then numbers, then text
fn compare(value: &Value, operand: &str) -> Option<Ordering> {
    let field = text(value)?;
    if let (Ok(a), Ok(b)) = (
        DateTime::parse_from_rfc3339(&field),
        DateTime::parse_from_rfc3339(operand),
    ) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Ok(b)) = (value.as_f64(), operand.parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    Some(field.as_str().cmp(operand))
}

/// SQL `ILIKE`: `%` matches any run, `_` any single character, `\` escapes
pub(crate) fn ilike(value: &str, pattern: &str) -> bool {
    let mut expr = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().unwrap_or('\\');
                expr.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
            }
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            c => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    RegexBuilder::new(&expr)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let Some(value) = row.get(&filter.column) else {
        return false;
    };
    match filter.op {
        FilterOp::Eq => text(value).as_deref() == Some(filter.value.as_str()),
        FilterOp::Gt => compare(value, &filter.value) == Some(Ordering::Greater),
        FilterOp::Lt => compare(value, &filter.value) == Some(Ordering::Less),
        FilterOp::ILike => text(value)
            .map(|v| ilike(&v, &filter.value))
            .unwrap_or(false),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.check_failure(&format!("select:{}", query.table_name()))?;
        Ok(self
            .matching(query)
            .iter()
            .map(|row| self.project(row, query.columns()))
            .collect())
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        self.check_failure(&format!("count:{}", query.table_name()))?;
        Ok(self.matching(query).len() as u64)
    }

    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>> {
        self.check_failure(&format!("insert:{}", table))?;
        Ok(self.store(table, rows, false))
    }

    async fn update(&self, query: &Query, changes: Value) -> Result<Vec<Value>> {
        self.check_failure(&format!("update:{}", query.table_name()))?;
        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(query.table_name()) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter_mut()
            .filter(|row| query.filters().iter().all(|f| matches(row, f)))
            .map(|row| {
                merge_into(row, &changes);
                row.clone()
            })
            .collect())
    }

    async fn delete(&self, query: &Query) -> Result<()> {
        self.check_failure(&format!("delete:{}", query.table_name()))?;
        if let Some(rows) = lock(&self.tables).get_mut(query.table_name()) {
            rows.retain(|row| !query.filters().iter().all(|f| matches(row, f)));
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Value) -> Result<Vec<Value>> {
        self.check_failure(&format!("upsert:{}", table))?;
        Ok(self.store(table, rows, true))
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value> {
        lock(&self.calls).push((function.to_string(), params));
        self.check_failure(&format!("rpc:{}", function))?;
        Ok(lock(&self.procedures)
            .get(function)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn current_user(&self) -> Result<AuthUser> {
        self.check_failure("current_user")?;
        lock(&self.current).clone().ok_or(SdkError::NotSignedIn)
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<String> {
        let mut url = format!("memory://auth/v1/authorize?provider={}", provider);
        if let Some(redirect_to) = redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect_to));
        }
        Ok(url)
    }

    async fn set_session(&self, session: Session) -> Result<AuthUser> {
        let user = lock(&self.users)
            .get(&session.access_token)
            .cloned()
            .ok_or_else(|| SdkError::remote("invalid JWT"))?;
        *lock(&self.current) = Some(user.clone());
        self.auth.set_session(Some(session.clone())).await;
        self.auth.emit(AuthEvent::SignedIn {
            session,
            user: user.clone(),
        });
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.check_failure("sign_out")?;
        *lock(&self.current) = None;
        self.auth.set_session(None).await;
        self.auth.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn update_user(&self, data: Value) -> Result<AuthUser> {
        self.check_failure("update_user")?;
        let user = {
            let mut current = lock(&self.current);
            let user = current.as_mut().ok_or(SdkError::NotSignedIn)?;
            if user.user_metadata.is_object() {
                merge_into(&mut user.user_metadata, &data);
            } else {
                user.user_metadata = data;
            }
            user.clone()
        };
        self.auth.emit(AuthEvent::UserUpdated(user.clone()));
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<StoredObject> {
        self.check_failure("upload")?;
        let key = format!("{}/{}", bucket, path.trim_start_matches('/'));
        let mut uploads = lock(&self.uploads);
        if !options.upsert && uploads.iter().any(|u| u.bucket == bucket && u.path == path) {
            return Err(SdkError::remote("The resource already exists"));
        }
        uploads.push(Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            body,
            options: options.clone(),
        });
        Ok(StoredObject { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pages() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed(
            "pages",
            vec![
                json!({ "id": "p1", "name": "Solar Rooftops", "status": "completed", "location": "Pune", "created_at": "2024-03-01T00:00:00+00:00" }),
                json!({ "id": "p2", "name": "Water Harvesting", "status": "undergoing", "location": "Delhi", "created_at": "2024-07-15T00:00:00+00:00" }),
                json!({ "id": "p3", "name": "Solar Schools", "status": "undergoing", "location": "Pune", "created_at": "2025-01-10T00:00:00+00:00" }),
            ],
        );
        backend
    }

    #[tokio::test]
    async fn test_select_with_filters() {
        let backend = pages();

        let undergoing = backend
            .select(&Query::table("pages").eq("status", "undergoing"))
            .await
            .unwrap();
        assert_eq!(undergoing.len(), 2);

        let solar = backend
            .select(&Query::table("pages").ilike("name", "%SOLAR%"))
            .await
            .unwrap();
        assert_eq!(solar.len(), 2);

        let in_2024 = backend
            .count(
                &Query::table("pages")
                    .gt("created_at", "2024-01-01T00:00:00Z")
                    .lt("created_at", "2025-01-01T00:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(in_2024, 2);
    }

    #[tokio::test]
    async fn test_select_missing_table_is_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.select(&Query::table("comments")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_projection_and_embedding() {
        let backend = MemoryBackend::new();
        backend.seed("users", vec![json!({ "id": "u1", "name": "Asha", "avatar_url": "a.png" })]);
        backend.seed("administrators", vec![json!({ "id": "u1", "role": "super_admin" })]);

        let rows = backend
            .select(&Query::table("administrators").select("*,user:users(*)"))
            .await
            .unwrap();
        assert_eq!(rows[0]["role"], "super_admin");
        assert_eq!(rows[0]["user"]["name"], "Asha");

        let names = pages()
            .select(&Query::table("pages").select("location"))
            .await
            .unwrap();
        assert_eq!(names[0], json!({ "location": "Pune" }));
    }

    #[tokio::test]
    async fn test_insert_update_delete_upsert() {
        let backend = MemoryBackend::new();

        let inserted = backend
            .insert("comments", json!([{ "text": "Great work" }]))
            .await
            .unwrap();
        let id = inserted[0]["id"].as_str().unwrap().to_string();
        assert!(inserted[0]["created_at"].is_string());

        let updated = backend
            .update(&Query::table("comments").eq("id", &id), json!({ "text": "Edited" }))
            .await
            .unwrap();
        assert_eq!(updated[0]["text"], "Edited");

        backend
            .upsert("comments", json!({ "id": id, "text": "Merged" }))
            .await
            .unwrap();
        assert_eq!(backend.rows("comments").len(), 1);
        assert_eq!(backend.rows("comments")[0]["text"], "Merged");

        backend.delete(&Query::table("comments").eq("id", &id)).await.unwrap();
        assert!(backend.rows("comments").is_empty());
    }

    #[tokio::test]
    async fn test_rpc_scripted_and_recorded() {
        let backend = MemoryBackend::new();
        backend.set_rpc_result("get_authorization", json!(true));

        assert_eq!(backend.rpc("get_authorization", json!({ "uid": "u1" })).await.unwrap(), json!(true));
        assert_eq!(backend.rpc("unknown", json!({})).await.unwrap(), Value::Null);

        let calls = backend.rpc_calls();
        assert_eq!(calls[0], ("get_authorization".to_string(), json!({ "uid": "u1" })));
    }

    #[tokio::test]
    async fn test_failures_surface_message() {
        let backend = pages();
        backend.fail("select:pages", "permission denied for table pages");

        let err = backend.select(&Query::table("pages")).await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table pages");
    }

    #[tokio::test]
    async fn test_auth_session_and_metadata() {
        let backend = MemoryBackend::new();
        let mut events = backend.subscribe();
        backend.register_user(
            "token-1",
            AuthUser {
                id: "u1".to_string(),
                email: None,
                role: None,
                user_metadata: json!({ "name": "Asha" }),
                created_at: None,
            },
        );

        assert!(matches!(backend.current_user().await, Err(SdkError::NotSignedIn)));
        assert!(backend.set_session(Session::new("nope", None)).await.is_err());

        backend.set_session(Session::new("token-1", None)).await.unwrap();
        assert_eq!(events.recv().await.unwrap().name(), "SIGNED_IN");

        let user = backend.update_user(json!({ "role": "institution" })).await.unwrap();
        assert_eq!(user.user_metadata["name"], "Asha");
        assert_eq!(user.user_metadata["role"], "institution");
        assert_eq!(events.recv().await.unwrap().name(), "USER_UPDATED");

        backend.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap().name(), "SIGNED_OUT");
        assert!(backend.current_user().await.is_err());
    }

    #[tokio::test]
    async fn test_upload_rejects_existing_without_upsert() {
        let backend = MemoryBackend::new();
        let options = UploadOptions::default();

        let object = backend.upload("docs", "a/b.pdf", vec![1], &options).await.unwrap();
        assert_eq!(object.key, "docs/a/b.pdf");
        assert!(backend.upload("docs", "a/b.pdf", vec![2], &options).await.is_err());
        assert_eq!(backend.uploads().len(), 1);
    }

    #[test]
    fn test_ilike_wildcards() {
        assert!(ilike("Solar Rooftops", "%solar%"));
        assert!(ilike("anything", "%%"));
        assert!(ilike("cat", "c_t"));
        assert!(!ilike("cart", "c_t"));
        assert!(ilike("a.b (c)", "a.b (%)"));
        assert!(!ilike("axb", "a.b"));
        assert!(ilike("100% solar", r"100\%%"));
        assert!(!ilike("1000 solar", r"100\%%"));
        assert!(!ilike("cat", r"c\_t"));
    }

    #[test]
    fn test_split_columns() {
        assert_eq!(split_columns("*,user:users(id,name)"), vec!["*", "user:users(id,name)"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_contains_pattern_matches_any_case(s in "[a-zA-Z0-9 .()*+?]{0,20}", prefix in "[a-z]{0,5}", suffix in "[a-z]{0,5}") {
            let value = format!("{}{}{}", prefix, s.to_uppercase(), suffix);
            let pattern = format!("%{}%", s.to_lowercase());
            prop_assert!(ilike(&value, &pattern));
        }
    }
}
