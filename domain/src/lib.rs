//! Domain library for the kanban board service.
//!
//! This crate stays light (serde derives only) and holds the entity types,
//! ports (traits), and error definitions. Keep adapters and IO concerns out
//! of this crate; the in-memory adapter under `adapters` is the exception and
//! exists for tests and the demo CLI.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A board groups columns. Boards are never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub title: String,
}

/// A column on a board.
///
/// `board` is an advisory reference: nothing checks that the board exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub board: String,
    /// Display position within the board, ascending. Not unique.
    pub order: i32,
}

/// A card inside a column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Advisory reference to the owning column.
    pub column: String,
    /// Human-readable creation stamp. Set once at creation and never parsed.
    pub created: String,
}

/// Input data for creating a board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBoard {
    pub title: String,
}

/// Input data for creating a column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewColumn {
    pub title: String,
    pub board: String,
    pub order: i32,
}

/// Input data for creating a card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub title: String,
    pub content: String,
    pub column: String,
}

/// Source of the human-readable `created` stamp for new cards.
pub trait Clock: Send + Sync {
    fn timestamp(&self) -> String;
}

/// Identifier generator for new records.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Storage port for the board collection.
pub trait BoardRepository: Send + Sync {
    fn get_board(&self, id: &str) -> Result<Option<Board>, CoreError>;
    fn scan_boards(&self) -> Result<Vec<Board>, CoreError>;
    /// Insert or replace by primary key.
    fn put_board(&self, board: &Board) -> Result<(), CoreError>;
    /// Delete by primary key; absent ids are a no-op.
    fn delete_board(&self, id: &str) -> Result<(), CoreError>;
}

/// Storage port for the column collection.
pub trait ColumnRepository: Send + Sync {
    fn get_column(&self, id: &str) -> Result<Option<Column>, CoreError>;
    fn scan_columns(&self) -> Result<Vec<Column>, CoreError>;
    /// Scan filtered on the `board` attribute.
    fn scan_columns_by_board(&self, board: &str) -> Result<Vec<Column>, CoreError>;
    fn put_column(&self, column: &Column) -> Result<(), CoreError>;
    fn delete_column(&self, id: &str) -> Result<(), CoreError>;
}

/// Storage port for the card collection.
pub trait CardRepository: Send + Sync {
    fn get_card(&self, id: &str) -> Result<Option<Card>, CoreError>;
    fn scan_cards(&self) -> Result<Vec<Card>, CoreError>;
    /// Scan filtered on the `column` attribute.
    fn scan_cards_by_column(&self, column: &str) -> Result<Vec<Card>, CoreError>;
    fn put_card(&self, card: &Card) -> Result<(), CoreError>;
    fn delete_card(&self, id: &str) -> Result<(), CoreError>;
}

/// A store holding all three collections.
pub trait KanbanStore: BoardRepository + ColumnRepository + CardRepository {}

impl<T> KanbanStore for T where T: BoardRepository + ColumnRepository + CardRepository {}

/// Core domain errors (no external error crates to keep deps at zero).
#[derive(Debug)]
pub enum CoreError {
    /// A fetch-modify-replace targeted a record that does not exist.
    NotFound { entity: &'static str, id: String },
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::NotFound { entity, id } => write!(f, "{} not found: {}", entity, id),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - kanban domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod ops;
pub mod service;
