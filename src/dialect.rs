//! SQL generation for the supported backends.
//!
//! The [`Dialect`] trait is small and stateless: every method returns SQL
//! text (or a parameter wrapping) and nothing else, so all backend-specific
//! strings stay colocated with their dialect. Both dialects preserve the
//! single-table schema, primary-key uniqueness on `atom_hash`, and faithful
//! JSON-value equality at a given array index.
//!
//! Differences between the two backends:
//!
//! | | SQLite | PostgreSQL |
//! |---|---|---|
//! | `args` column | binary JSON blob via `jsonb(?)` | native `JSONB` |
//! | table | `WITHOUT ROWID` (key-organized) | heap |
//! | placeholders | positional `?` | numbered `$n` |
//! | conflict target | implicit | explicit `(atom_hash)` |
//! | JSON equality | extract on both sides, parameter pinned in a one-element array | `->` element compared to a `::jsonb` parameter |

/// SQL generation contract. One implementation per backend.
pub trait Dialect: Send + Sync {
    /// DDL for the `facts` table.
    fn create_table_sql(&self) -> &'static str;
    /// DDL for the non-unique predicate index.
    fn create_index_sql(&self) -> &'static str;
    /// Insert-if-absent for a single fact row.
    fn add_sql(&self) -> &'static str;
    /// Delete by primary key.
    fn remove_sql(&self) -> &'static str;
    /// Existence probe by primary key.
    fn contains_sql(&self) -> &'static str;
    /// Base query for pattern matching: filter by predicate key, select
    /// the predicate and the args column rendered as JSON text.
    fn get_facts_base_sql(&self) -> &'static str;
    /// Filter fragment comparing the args element at `index` against the
    /// next parameter. `param_idx` is the 1-based ordinal of that
    /// parameter, for dialects with numbered placeholders.
    fn get_facts_fragment(&self, index: usize, param_idx: usize) -> String;
    /// Multi-row insert-if-absent template for `rows` rows.
    fn batch_insert_sql(&self, rows: usize) -> String;
    /// Wraps an encoded constant so it binds as a comparison-safe JSON
    /// parameter for [`Dialect::get_facts_fragment`].
    fn json_param(&self, encoded: &str) -> String;
}

// ------------- SQLite -------------
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS facts (
            predicate TEXT NOT NULL,
            atom_hash BIGINT NOT NULL,
            args BLOB NOT NULL,
            PRIMARY KEY(atom_hash)
        ) WITHOUT ROWID;"
    }

    fn create_index_sql(&self) -> &'static str {
        "CREATE INDEX IF NOT EXISTS idx_predicate ON facts(predicate);"
    }

    fn add_sql(&self) -> &'static str {
        // jsonb() converts the canonical JSON text into SQLite's binary
        // JSONB representation.
        "INSERT INTO facts (predicate, atom_hash, args) VALUES (?, ?, jsonb(?)) ON CONFLICT DO NOTHING"
    }

    fn remove_sql(&self) -> &'static str {
        "DELETE FROM facts WHERE atom_hash = ?"
    }

    fn contains_sql(&self) -> &'static str {
        "SELECT COUNT(*) FROM facts WHERE atom_hash = ?"
    }

    fn get_facts_base_sql(&self) -> &'static str {
        "SELECT predicate, json(args) FROM facts WHERE predicate = ?"
    }

    fn get_facts_fragment(&self, index: usize, _param_idx: usize) -> String {
        // json_extract on both sides ensures value comparison. The
        // parameter arrives wrapped in a one-element array (see
        // json_param), pinning the extraction path to '$[0]'.
        format!(
            " AND json_extract(args, '$[{}]') = json_extract(?, '$[0]')",
            index
        )
    }

    fn batch_insert_sql(&self, rows: usize) -> String {
        let mut sql = String::from("INSERT INTO facts (predicate, atom_hash, args) VALUES ");
        for i in 0..rows {
            if i > 0 {
                sql.push(',');
            }
            sql.push_str("(?, ?, jsonb(?))");
        }
        sql.push_str(" ON CONFLICT DO NOTHING");
        sql
    }

    fn json_param(&self, encoded: &str) -> String {
        format!("[{}]", encoded)
    }
}

// ------------- PostgreSQL -------------
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS facts (
            predicate TEXT NOT NULL,
            atom_hash BIGINT NOT NULL,
            args JSONB NOT NULL,
            PRIMARY KEY(atom_hash)
        );"
    }

    fn create_index_sql(&self) -> &'static str {
        "CREATE INDEX IF NOT EXISTS idx_predicate ON facts(predicate);"
    }

    fn add_sql(&self) -> &'static str {
        // ON CONFLICT needs an explicit target; the primary key provides
        // the backing index.
        "INSERT INTO facts (predicate, atom_hash, args) VALUES ($1, $2, $3::jsonb) ON CONFLICT (atom_hash) DO NOTHING"
    }

    fn remove_sql(&self) -> &'static str {
        "DELETE FROM facts WHERE atom_hash = $1"
    }

    fn contains_sql(&self) -> &'static str {
        "SELECT COUNT(*) FROM facts WHERE atom_hash = $1"
    }

    fn get_facts_base_sql(&self) -> &'static str {
        "SELECT predicate, args::text FROM facts WHERE predicate = $1"
    }

    fn get_facts_fragment(&self, index: usize, param_idx: usize) -> String {
        // '->' extracts the array element as jsonb, compared natively
        // against the typed parameter.
        format!(" AND (args -> {}) = ${}::jsonb", index, param_idx)
    }

    fn batch_insert_sql(&self, rows: usize) -> String {
        let mut sql = String::from("INSERT INTO facts (predicate, atom_hash, args) VALUES ");
        for i in 0..rows {
            if i > 0 {
                sql.push(',');
            }
            let base = i * 3;
            sql.push_str(&format!("(${}, ${}, ${}::jsonb)", base + 1, base + 2, base + 3));
        }
        sql.push_str(" ON CONFLICT (atom_hash) DO NOTHING");
        sql
    }

    fn json_param(&self, encoded: &str) -> String {
        encoded.to_owned()
    }
}
