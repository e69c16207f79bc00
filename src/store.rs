//! The persistent fact store.
//!
//! [`FactStore`] funnels every mutation through prepared statements against
//! a single `facts` table; the backend is the source of truth and there are
//! no in-process caches above it. Any thread may call any method at any
//! time: parallelism is bounded by the connection pool, and each call
//! acquires a connection for its duration.
//!
//! The store speaks two backends through the [`crate::dialect`] layer: an
//! embedded SQLite file (or isolated in-memory database) and, behind the
//! `postgres` cargo feature, a PostgreSQL server.
//!
//! Write-path failures are logged and reported as `false`; read paths
//! surface errors to the caller. Deduplication is the primary key on the
//! structural atom hash, so `add` is insert-if-absent and a conflict is not
//! an error.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::de::{DeserializeSeed, SeqAccess, Visitor};
use serde_json::Value;
use tracing::{debug, warn};

#[cfg(feature = "postgres")]
use postgres::fallible_iterator::FallibleIterator;
#[cfg(feature = "postgres")]
use postgres::NoTls;
#[cfg(feature = "postgres")]
use r2d2_postgres::PostgresConnectionManager;

use crate::atom::{Atom, PredicateSym, Term};
use crate::codec::{decode_stored_atom, encode_atom, encode_constant, encode_row, FactRow};
#[cfg(feature = "postgres")]
use crate::dialect::PostgresDialect;
use crate::dialect::{Dialect, SqliteDialect};
use crate::error::{GroundworkError, Result};

/// Rows per multi-row INSERT; balances SQL parsing against transaction size.
const BATCH_SIZE: usize = 500;

/// Sequence for minting isolated in-memory database names.
static IN_MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

// ------------- FactReader -------------
/// Read access to a set of facts. Implemented by [`FactStore`] and by
/// [`crate::memory::MemoryStore`], and the input side of [`FactStore::merge`].
pub trait FactReader {
    /// The distinct predicates present.
    fn list_predicates(&self) -> Vec<PredicateSym>;

    /// Streams every fact matching `pattern` through `yield_fn`. Constant
    /// arguments in the pattern bind their position; variables are
    /// wildcards. An error returned from `yield_fn` stops the scan and is
    /// propagated.
    fn get_facts(
        &self,
        pattern: &Atom,
        yield_fn: &mut dyn FnMut(Atom) -> Result<()>,
    ) -> Result<()>;
}

// ------------- Options -------------
/// Pool sizing, fixed at construction time.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Maximum open connections.
    pub max_open: u32,
    /// Idle connections kept ready for reuse.
    pub idle: u32,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self { max_open: 10, idle: 4 }
    }
}

/// SQLite tuning knobs. Every pragma here is applied, in sorted key order,
/// to each pooled connection; callers may override any default.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pragmas: BTreeMap<String, String>,
    pub pool: PoolOptions,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        let mut pragmas = BTreeMap::new();
        for (key, value) in [
            ("journal_mode", "WAL"),
            ("synchronous", "OFF"),
            ("cache_size", "-64000"),
            ("temp_store", "MEMORY"),
            ("mmap_size", "268435456"),
            ("busy_timeout", "5000"),
            ("foreign_keys", "OFF"),
            ("auto_vacuum", "INCREMENTAL"),
        ] {
            pragmas.insert(key.to_owned(), value.to_owned());
        }
        Self { pragmas, pool: PoolOptions::default() }
    }
}

impl SqliteOptions {
    /// Overrides (or adds) a PRAGMA applied to every connection.
    pub fn pragma(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pragmas.insert(key.into(), value.into());
        self
    }
}

// ------------- FactStore -------------
enum Backend {
    Sqlite(Pool<SqliteConnectionManager>),
    #[cfg(feature = "postgres")]
    Postgres(Pool<PostgresConnectionManager<NoTls>>),
}

/// A fact store over a pooled relational backend.
pub struct FactStore {
    backend: Backend,
    dialect: Box<dyn Dialect>,
}

impl FactStore {
    /// Opens (or creates) a SQLite-backed store. The path `:memory:` yields
    /// a private in-memory database: each call mints a unique shared-cache
    /// URL so separate stores never share state while the pool's
    /// connections all see the same data.
    pub fn open_sqlite(path: &str, options: SqliteOptions) -> Result<FactStore> {
        let manager = if path == ":memory:" {
            let id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
            SqliteConnectionManager::file(format!(
                "file:groundwork_mem_{}?mode=memory&cache=shared",
                id
            ))
        } else {
            SqliteConnectionManager::file(path)
        };
        let pragmas = options.pragmas.clone();
        let manager = manager.with_init(move |conn| {
            for (key, value) in &pragmas {
                conn.pragma_update(None, key, value)?;
            }
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(options.pool.max_open)
            .min_idle(Some(options.pool.idle))
            .build(manager)?;
        let store = FactStore {
            backend: Backend::Sqlite(pool),
            dialect: Box::new(SqliteDialect),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Connects to a PostgreSQL-backed store from a connection string.
    /// Pool defaults follow [`PoolOptions`].
    #[cfg(feature = "postgres")]
    pub fn open_postgres(url: &str) -> Result<FactStore> {
        let config: postgres::Config = url.parse()?;
        let manager = PostgresConnectionManager::new(config, NoTls);
        let defaults = PoolOptions::default();
        let pool = Pool::builder()
            .max_size(defaults.max_open)
            .min_idle(Some(defaults.idle))
            .build(manager)?;
        Self::with_postgres_pool(pool)
    }

    /// Builds a store over a caller-supplied pool handle. The pool is
    /// shared: closing this store releases only its own handle, and the
    /// caller's connections stay open.
    #[cfg(feature = "postgres")]
    pub fn with_postgres_pool(pool: Pool<PostgresConnectionManager<NoTls>>) -> Result<FactStore> {
        let store = FactStore {
            backend: Backend::Postgres(pool),
            dialect: Box::new(PostgresDialect),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        match &self.backend {
            Backend::Sqlite(pool) => {
                let conn = pool.get()?;
                conn.execute_batch(self.dialect.create_table_sql())?;
                conn.execute_batch(self.dialect.create_index_sql())?;
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                client.batch_execute(self.dialect.create_table_sql())?;
                client.batch_execute(self.dialect.create_index_sql())?;
            }
        }
        Ok(())
    }

    /// Shuts the store down, returning pooled connections and their cached
    /// statements. A pool handed in by the caller stays open for the caller.
    pub fn close(self) {
        drop(self);
    }

    // ------------- Single-fact operations -------------

    /// Adds a ground atom. Returns `true` iff the fact was not present.
    /// Non-ground atoms and backend failures are logged and yield `false`.
    pub fn add(&self, atom: &Atom) -> bool {
        match self.try_add(atom) {
            Ok(inserted) => inserted,
            Err(e) => {
                warn!(error = %e, atom = %atom, "add failed");
                false
            }
        }
    }

    fn try_add(&self, atom: &Atom) -> Result<bool> {
        let row = encode_row(atom)?;
        let affected = match &self.backend {
            Backend::Sqlite(pool) => {
                let conn = pool.get()?;
                let mut stmt = conn.prepare_cached(self.dialect.add_sql())?;
                stmt.execute(rusqlite::params![row.predicate, row.atom_hash, row.args])? as u64
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                client.execute(
                    self.dialect.add_sql(),
                    &[&row.predicate, &row.atom_hash, &row.args],
                )?
            }
        };
        Ok(affected > 0)
    }

    /// Whether the given ground atom is present.
    pub fn contains(&self, atom: &Atom) -> bool {
        match self.try_contains(atom) {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, atom = %atom, "contains failed");
                false
            }
        }
    }

    fn try_contains(&self, atom: &Atom) -> Result<bool> {
        let hash = crate::fingerprint::atom_hash(atom)?;
        let count: i64 = match &self.backend {
            Backend::Sqlite(pool) => {
                let conn = pool.get()?;
                let mut stmt = conn.prepare_cached(self.dialect.contains_sql())?;
                stmt.query_row(rusqlite::params![hash], |row| row.get(0))?
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                let row = client.query_one(self.dialect.contains_sql(), &[&hash])?;
                row.try_get(0)?
            }
        };
        Ok(count > 0)
    }

    /// Removes a ground atom. Returns `true` iff a row was deleted.
    pub fn remove(&self, atom: &Atom) -> bool {
        match self.try_remove(atom) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, atom = %atom, "remove failed");
                false
            }
        }
    }

    fn try_remove(&self, atom: &Atom) -> Result<bool> {
        let hash = crate::fingerprint::atom_hash(atom)?;
        let affected = match &self.backend {
            Backend::Sqlite(pool) => {
                let conn = pool.get()?;
                let mut stmt = conn.prepare_cached(self.dialect.remove_sql())?;
                stmt.execute(rusqlite::params![hash])? as u64
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                client.execute(self.dialect.remove_sql(), &[&hash])?
            }
        };
        Ok(affected > 0)
    }

    /// Exact fact count.
    pub fn estimate_fact_count(&self) -> i64 {
        let counted: Result<i64> = (|| {
            const SQL: &str = "SELECT COUNT(*) FROM facts";
            match &self.backend {
                Backend::Sqlite(pool) => {
                    let conn = pool.get()?;
                    Ok(conn.query_row(SQL, [], |row| row.get(0))?)
                }
                #[cfg(feature = "postgres")]
                Backend::Postgres(pool) => {
                    let mut client = pool.get()?;
                    let row = client.query_one(SQL, &[])?;
                    Ok(row.try_get(0)?)
                }
            }
        })();
        match counted {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "fact count failed");
                0
            }
        }
    }

    // ------------- Pattern queries -------------

    fn query_facts(
        &self,
        pattern: &Atom,
        yield_fn: &mut dyn FnMut(Atom) -> Result<()>,
    ) -> Result<()> {
        // Exact predicate-key lookup, then one JSON-path filter per bound
        // argument position.
        let mut sql = self.dialect.get_facts_base_sql().to_owned();
        let mut params: Vec<String> = vec![pattern.predicate.key()];
        for (index, term) in pattern.args.iter().enumerate() {
            if let Term::Constant(constant) = term {
                let encoded = encode_constant(constant)?.to_string();
                sql.push_str(&self.dialect.get_facts_fragment(index, params.len() + 1));
                params.push(self.dialect.json_param(&encoded));
            }
        }

        match &self.backend {
            Backend::Sqlite(pool) => {
                let conn = pool.get()?;
                let mut stmt = conn.prepare_cached(&sql)?;
                let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
                while let Some(row) = rows.next()? {
                    let args: String = row.get(1)?;
                    yield_fn(decode_stored_atom(&pattern.predicate, &args)?)?;
                }
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                let mut rows = client.query_raw(
                    sql.as_str(),
                    params.iter().map(|p| p as &(dyn postgres::types::ToSql + Sync)),
                )?;
                while let Some(row) = rows.next()? {
                    let args: String = row.try_get(1)?;
                    yield_fn(decode_stored_atom(&pattern.predicate, &args)?)?;
                }
            }
        }
        Ok(())
    }

    fn query_predicates(&self) -> Result<Vec<PredicateSym>> {
        const SQL: &str = "SELECT DISTINCT predicate FROM facts";
        let mut keys: Vec<String> = Vec::new();
        match &self.backend {
            Backend::Sqlite(pool) => {
                let conn = pool.get()?;
                let mut stmt = conn.prepare_cached(SQL)?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    keys.push(row.get(0)?);
                }
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                for row in client.query(SQL, &[])? {
                    keys.push(row.try_get(0)?);
                }
            }
        }
        let mut predicates = Vec::with_capacity(keys.len());
        for key in keys {
            match PredicateSym::from_key(&key) {
                Ok(predicate) => predicates.push(predicate),
                Err(e) => warn!(error = %e, key = %key, "skipping unparsable predicate key"),
            }
        }
        Ok(predicates)
    }

    // ------------- Bulk operations -------------

    /// Inserts many atoms through the batched path: rows are pre-encoded
    /// outside the transaction, then written as multi-row inserts of
    /// at most 500 rows each, all inside a single transaction. Non-ground
    /// atoms are skipped. Duplicates are absorbed by the conflict clause.
    pub fn batch_insert(&self, atoms: &[Atom]) -> Result<()> {
        let mut rows: Vec<FactRow> = Vec::with_capacity(atoms.len());
        for atom in atoms {
            match encode_row(atom) {
                Ok(row) => rows.push(row),
                Err(e) => debug!(error = %e, atom = %atom, "skipping atom in batch"),
            }
        }
        if rows.is_empty() {
            return Ok(());
        }

        match &self.backend {
            Backend::Sqlite(pool) => {
                let mut conn = pool.get()?;
                let tx = conn.transaction()?;
                for chunk in rows.chunks(BATCH_SIZE) {
                    let sql = self.dialect.batch_insert_sql(chunk.len());
                    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() * 3);
                    for row in chunk {
                        params.push(&row.predicate);
                        params.push(&row.atom_hash);
                        params.push(&row.args);
                    }
                    tx.execute(&sql, &params[..])?;
                }
                tx.commit()?;
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => {
                let mut client = pool.get()?;
                let mut tx = client.transaction()?;
                for chunk in rows.chunks(BATCH_SIZE) {
                    let sql = self.dialect.batch_insert_sql(chunk.len());
                    let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> =
                        Vec::with_capacity(chunk.len() * 3);
                    for row in chunk {
                        params.push(&row.predicate);
                        params.push(&row.atom_hash);
                        params.push(&row.args);
                    }
                    tx.execute(sql.as_str(), &params[..])?;
                }
                tx.commit()?;
            }
        }
        Ok(())
    }

    /// Copies every fact of `other` into this store through the batch
    /// path. Duplicates are absorbed silently; atomicity is per batch
    /// call, not per merge.
    pub fn merge<R: FactReader + ?Sized>(&self, other: &R) {
        let mut facts = Vec::new();
        for predicate in other.list_predicates() {
            let collected = other.get_facts(&Atom::new_query(predicate), &mut |atom| {
                facts.push(atom);
                Ok(())
            });
            if let Err(e) = collected {
                warn!(error = %e, "merge failed to read facts");
            }
        }
        if facts.is_empty() {
            return;
        }
        if let Err(e) = self.batch_insert(&facts) {
            warn!(error = %e, "merge failed to batch insert facts");
        }
    }

    // ------------- Streaming export / import -------------

    /// Writes every fact as a JSON array of atom objects. Predicates are
    /// emitted in (symbol, arity) order; row order within a predicate is
    /// whatever the backend returns. Returns the number of bytes written.
    pub fn export<W: Write>(&self, writer: W) -> Result<u64> {
        let mut out = CountingWriter::new(writer);
        out.write_all(b"[")?;
        let mut predicates = self.list_predicates();
        predicates.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.arity.cmp(&b.arity)));
        let mut first = true;
        for predicate in predicates {
            self.get_facts(&Atom::new_query(predicate), &mut |atom| {
                if !first {
                    out.write_all(b",")?;
                }
                first = false;
                let value = encode_atom(&atom)?;
                serde_json::to_writer(&mut out, &value)?;
                Ok(())
            })?;
        }
        out.write_all(b"]")?;
        Ok(out.count)
    }

    /// Reads a JSON array of atom objects and bulk-inserts them, flushing
    /// through the batch path every 500 atoms and once at end of stream.
    /// Any element that is not a valid atom object aborts the import.
    /// Returns the number of bytes read.
    pub fn import<R: Read>(&self, reader: R) -> Result<u64> {
        let mut input = CountingReader::new(reader);
        let mut deserializer = serde_json::Deserializer::from_reader(&mut input);
        AtomStream { store: self }
            .deserialize(&mut deserializer)
            .map_err(|e| GroundworkError::Import(e.to_string()))?;
        deserializer
            .end()
            .map_err(|e| GroundworkError::Import(e.to_string()))?;
        Ok(input.count)
    }
}

impl FactReader for FactStore {
    fn list_predicates(&self) -> Vec<PredicateSym> {
        match self.query_predicates() {
            Ok(predicates) => predicates,
            Err(e) => {
                warn!(error = %e, "listing predicates failed");
                Vec::new()
            }
        }
    }

    fn get_facts(
        &self,
        pattern: &Atom,
        yield_fn: &mut dyn FnMut(Atom) -> Result<()>,
    ) -> Result<()> {
        self.query_facts(pattern, yield_fn)
    }
}

// ------------- Import stream -------------
/// Deserialization seed that batches atoms straight into the store while
/// the array is being read, so imports never hold the whole stream in
/// memory.
struct AtomStream<'a> {
    store: &'a FactStore,
}

impl<'de> DeserializeSeed<'de> for AtomStream<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for AtomStream<'_> {
    type Value = ();

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a JSON array of atom objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        use serde::de::Error;
        let mut batch: Vec<Atom> = Vec::with_capacity(BATCH_SIZE);
        while let Some(value) = seq.next_element::<Value>()? {
            batch.push(crate::codec::decode_atom(&value).map_err(Error::custom)?);
            if batch.len() >= BATCH_SIZE {
                self.store.batch_insert(&batch).map_err(Error::custom)?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.store.batch_insert(&batch).map_err(Error::custom)?;
        }
        Ok(())
    }
}

// ------------- Counting I/O wrappers -------------
struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

struct CountingReader<R: Read> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.count += read as u64;
        Ok(read)
    }
}
