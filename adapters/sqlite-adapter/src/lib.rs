//! sqlite-adapter — SQLite implementation of the `ProductRepository` port.
//!
//! Purpose
//! - Provide a lightweight, file-based store so the catalog survives restarts
//!   without an external database server.
//! - Implements the `ProductRepository` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `id` is an `INTEGER PRIMARY KEY AUTOINCREMENT`: SQLite assigns it when
//!   inserted as NULL and never hands out an id that was used before.
//! - The schema is created on open; there are no migrations.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use domain::{CoreError, Product, ProductId, ProductRepository};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, name, quantity, price, notes FROM products";

/// SQLite-backed product store.
pub struct SqliteProductRepo {
    conn: Mutex<Connection>,
}

impl SqliteProductRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                CoreError::Repository(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        debug!(path = %path.display(), "opened sqlite database");
        Self::with_connection(conn)
    }

    /// Private in-memory database, gone once the repo is dropped.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL,
            notes TEXT
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        quantity: row.get(2)?,
        price: row.get(3)?,
        notes: row.get(4)?,
    })
}

impl ProductRepository for SqliteProductRepo {
    fn find_all(&self) -> Result<Vec<Product>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .map_err(map_sqerr)?;
        let rows = stmt.query_map([], row_to_product).map_err(map_sqerr)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sqerr)
    }

    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            row_to_product,
        )
        .optional()
        .map_err(map_sqerr)
    }

    fn save(&self, mut product: Product) -> Result<Product, CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO products(id, name, quantity, price, notes) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                quantity = excluded.quantity,
                price = excluded.price,
                notes = excluded.notes",
            params![
                product.id,
                product.name,
                product.quantity,
                product.price,
                product.notes,
            ],
        )
        .map_err(map_sqerr)?;
        // last_insert_rowid is only meaningful when the row was inserted with a NULL id.
        if product.id.is_none() {
            product.id = Some(conn.last_insert_rowid());
        }
        Ok(product)
    }

    fn delete_by_id(&self, id: ProductId) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM products WHERE id = ?1", params![id])
            .map_err(map_sqerr)?;
        Ok(())
    }
}
