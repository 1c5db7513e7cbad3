//! sqlite-adapter: SQLite implementation of the board, column and card ports
//! for local development.
//!
//! Purpose
//! - Provide a lightweight, file-based store to run the system locally
//!   without cloud dependencies.
//! - Implements `BoardRepository`, `ColumnRepository` and `CardRepository`
//!   from the `domain` crate with the same semantics as the Dynamo adapter:
//!   puts replace by primary key, deletes of absent ids are no-ops, filtered
//!   scans match one attribute.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `column` and `order` are SQL keywords and are always quoted.

use std::path::Path;

use domain::{Board, BoardRepository, Card, CardRepository, Column, ColumnRepository, CoreError};
use rusqlite::{params, Connection, Params, Row};

const BOARD_SELECT: &str = "SELECT id, title FROM boards";
const COLUMN_SELECT: &str = "SELECT id, title, board, \"order\" FROM columns";
const CARD_SELECT: &str = "SELECT id, title, content, \"column\", created FROM cards";

/// SQLite-backed store for local development.
pub struct SqliteRepo {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self { conn: std::sync::Mutex::new(conn) })
    }

    /// Open a database file, creating its parent directory first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() { let _ = std::fs::create_dir_all(dir); }
        Self::new(path)
    }

    fn query_all<T, P: Params>(&self, sql: &str, params: P, map: fn(&Row) -> Result<T, CoreError>) -> Result<Vec<T>, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(sql).map_err(map_sqerr)?;
        let mut rows = stmt.query(params).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(map(row)?);
        }
        Ok(out)
    }

    fn query_one<T, P: Params>(&self, sql: &str, params: P, map: fn(&Row) -> Result<T, CoreError>) -> Result<Option<T>, CoreError> {
        Ok(self.query_all(sql, params, map)?.into_iter().next())
    }

    fn execute<P: Params>(&self, sql: &str, params: P) -> Result<(), CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        conn.execute(sql, params).map_err(map_sqerr)?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS boards (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS columns (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            board TEXT NOT NULL,
            "order" INTEGER
        );
        CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            "column" TEXT NOT NULL,
            created TEXT NOT NULL
        );
        "#
    ).map_err(map_sqerr)?;
    Ok(())
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError { CoreError::Repository(format!("sqlite error: {e}")) }

fn row_to_board(row: &Row) -> Result<Board, CoreError> {
    Ok(Board {
        id: row.get(0).map_err(map_sqerr)?,
        title: row.get(1).map_err(map_sqerr)?,
    })
}

fn row_to_column(row: &Row) -> Result<Column, CoreError> {
    let raw: Option<i64> = row.get(3).map_err(map_sqerr)?;
    let order = i32::try_from(raw.unwrap_or(0))
        .map_err(|e| CoreError::Repository(format!("bad column order {raw:?}: {e}")))?;
    Ok(Column {
        id: row.get(0).map_err(map_sqerr)?,
        title: row.get(1).map_err(map_sqerr)?,
        board: row.get(2).map_err(map_sqerr)?,
        order,
    })
}

fn row_to_card(row: &Row) -> Result<Card, CoreError> {
    Ok(Card {
        id: row.get(0).map_err(map_sqerr)?,
        title: row.get(1).map_err(map_sqerr)?,
        content: row.get(2).map_err(map_sqerr)?,
        column: row.get(3).map_err(map_sqerr)?,
        created: row.get(4).map_err(map_sqerr)?,
    })
}

impl BoardRepository for SqliteRepo {
    fn get_board(&self, id: &str) -> Result<Option<Board>, CoreError> {
        self.query_one(&format!("{BOARD_SELECT} WHERE id = ?1"), params![id], row_to_board)
    }

    fn scan_boards(&self) -> Result<Vec<Board>, CoreError> {
        self.query_all(BOARD_SELECT, [], row_to_board)
    }

    fn put_board(&self, board: &Board) -> Result<(), CoreError> {
        self.execute(
            "INSERT OR REPLACE INTO boards (id, title) VALUES (?1, ?2)",
            params![board.id, board.title],
        )
    }

    fn delete_board(&self, id: &str) -> Result<(), CoreError> {
        self.execute("DELETE FROM boards WHERE id = ?1", params![id])
    }
}

impl ColumnRepository for SqliteRepo {
    fn get_column(&self, id: &str) -> Result<Option<Column>, CoreError> {
        self.query_one(&format!("{COLUMN_SELECT} WHERE id = ?1"), params![id], row_to_column)
    }

    fn scan_columns(&self) -> Result<Vec<Column>, CoreError> {
        self.query_all(COLUMN_SELECT, [], row_to_column)
    }

    fn scan_columns_by_board(&self, board: &str) -> Result<Vec<Column>, CoreError> {
        self.query_all(&format!("{COLUMN_SELECT} WHERE board = ?1"), params![board], row_to_column)
    }

    fn put_column(&self, column: &Column) -> Result<(), CoreError> {
        self.execute(
            "INSERT OR REPLACE INTO columns (id, title, board, \"order\") VALUES (?1, ?2, ?3, ?4)",
            params![column.id, column.title, column.board, column.order],
        )
    }

    fn delete_column(&self, id: &str) -> Result<(), CoreError> {
        self.execute("DELETE FROM columns WHERE id = ?1", params![id])
    }
}

impl CardRepository for SqliteRepo {
    fn get_card(&self, id: &str) -> Result<Option<Card>, CoreError> {
        self.query_one(&format!("{CARD_SELECT} WHERE id = ?1"), params![id], row_to_card)
    }

    fn scan_cards(&self) -> Result<Vec<Card>, CoreError> {
        self.query_all(CARD_SELECT, [], row_to_card)
    }

    fn scan_cards_by_column(&self, column: &str) -> Result<Vec<Card>, CoreError> {
        self.query_all(&format!("{CARD_SELECT} WHERE \"column\" = ?1"), params![column], row_to_card)
    }

    fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        self.execute(
            "INSERT OR REPLACE INTO cards (id, title, content, \"column\", created) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![card.id, card.title, card.content, card.column, card.created],
        )
    }

    fn delete_card(&self, id: &str) -> Result<(), CoreError> {
        self.execute("DELETE FROM cards WHERE id = ?1", params![id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_db() -> (SqliteRepo, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let repo = SqliteRepo::new(path).unwrap();
        (repo, dir)
    }

    fn mk_card(id: &str, column: &str) -> Card {
        Card {
            id: id.into(),
            title: "test card".into(),
            content: "test content".into(),
            column: column.into(),
            created: "2024-01-02 03:04:05.000006".into(),
        }
    }

    #[test]
    fn board_put_get_roundtrip() {
        let (repo, _dir) = tmp_db();
        let board = Board { id: "b1".into(), title: "Sprint".into() };
        repo.put_board(&board).unwrap();
        assert_eq!(repo.get_board("b1").unwrap(), Some(board));
        assert!(repo.get_board("missing").unwrap().is_none());
    }

    #[test]
    fn put_card_replaces_by_id() {
        let (repo, _dir) = tmp_db();
        repo.put_card(&mk_card("123", "old_column")).unwrap();
        repo.put_card(&mk_card("123", "new_column")).unwrap();
        let cards = repo.scan_cards().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].column, "new_column");
    }

    #[test]
    fn scan_cards_by_column_filters() {
        let (repo, _dir) = tmp_db();
        repo.put_card(&mk_card("a", "todo")).unwrap();
        repo.put_card(&mk_card("b", "done")).unwrap();
        let todo = repo.scan_cards_by_column("todo").unwrap();
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].id, "a");
    }

    #[test]
    fn columns_keep_order_and_filter_by_board() {
        let (repo, _dir) = tmp_db();
        for (id, board, order) in [("c1", "b1", 2), ("c2", "b2", 0), ("c3", "b1", -1)] {
            repo.put_column(&Column { id: id.into(), title: id.into(), board: board.into(), order }).unwrap();
        }
        let mut cols = repo.scan_columns_by_board("b1").unwrap();
        cols.sort_by_key(|c| c.order);
        let ids: Vec<&str> = cols.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1"]);
        assert_eq!(repo.get_column("c3").unwrap().unwrap().order, -1);
    }

    #[test]
    fn null_order_reads_as_zero() {
        let (repo, _dir) = tmp_db();
        repo.execute("INSERT INTO columns (id, title, board) VALUES ('c1', 'Todo', 'b1')", []).unwrap();
        assert_eq!(repo.get_column("c1").unwrap().unwrap().order, 0);
    }

    #[test]
    fn out_of_range_order_is_an_error() {
        let (repo, _dir) = tmp_db();
        repo.execute(
            "INSERT INTO columns (id, title, board, \"order\") VALUES ('c1', 'Todo', 'b1', ?1)",
            params![i64::from(i32::MAX) + 1],
        )
        .unwrap();
        let err = repo.get_column("c1").unwrap_err();
        assert!(matches!(err, CoreError::Repository(ref msg) if msg.contains("order")));
    }

    #[test]
    fn delete_missing_is_noop() {
        let (repo, _dir) = tmp_db();
        repo.delete_card("nope").unwrap();
        repo.put_card(&mk_card("123", "x")).unwrap();
        repo.delete_card("123").unwrap();
        assert!(repo.get_card("123").unwrap().is_none());
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("k.db");
        {
            let repo = SqliteRepo::open_creating_dirs(&path).unwrap();
            repo.put_board(&Board { id: "b1".into(), title: "Keep".into() }).unwrap();
        }
        let repo = SqliteRepo::open_creating_dirs(&path).unwrap();
        assert_eq!(repo.scan_boards().unwrap().len(), 1);
    }
}
