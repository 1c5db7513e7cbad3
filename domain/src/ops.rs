//! Named operations with typed arguments and results.
//!
//! Each API operation is one variant of [`Operation`]; [`KanbanService::execute`]
//! is the single table routing a variant to its handler. Both enums serialize
//! as internally tagged JSON keyed on `op`, e.g.
//! `{"op":"addColumn","title":"Todo","board":"b1","order":0}`.

use serde::{Deserialize, Serialize};

use crate::service::KanbanService;
use crate::{Board, Card, Clock, Column, CoreError, IdGenerator, KanbanStore};
use crate::{NewBoard, NewCard, NewColumn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Operation {
    #[serde(rename = "boards")]
    ListBoards {
        #[serde(default)]
        id: Option<String>,
    },
    #[serde(rename = "columns")]
    ListColumns {
        #[serde(default)]
        board: Option<String>,
    },
    #[serde(rename = "cards")]
    ListCards {
        #[serde(default)]
        column: Option<String>,
    },
    #[serde(rename = "addBoard")]
    AddBoard { title: String },
    #[serde(rename = "addColumn")]
    AddColumn {
        title: String,
        board: String,
        order: i32,
    },
    #[serde(rename = "addCard")]
    AddCard {
        title: String,
        content: String,
        column: String,
    },
    #[serde(rename = "updateCard")]
    UpdateCard { id: String, column: String },
    #[serde(rename = "editCard")]
    EditCard {
        id: String,
        title: String,
        content: String,
    },
    #[serde(rename = "removeCard")]
    RemoveCard { id: String },
}

impl Operation {
    /// The wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListBoards { .. } => "boards",
            Operation::ListColumns { .. } => "columns",
            Operation::ListCards { .. } => "cards",
            Operation::AddBoard { .. } => "addBoard",
            Operation::AddColumn { .. } => "addColumn",
            Operation::AddCard { .. } => "addCard",
            Operation::UpdateCard { .. } => "updateCard",
            Operation::EditCard { .. } => "editCard",
            Operation::RemoveCard { .. } => "removeCard",
        }
    }

    /// Whether the operation writes to the store.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Operation::ListBoards { .. }
                | Operation::ListColumns { .. }
                | Operation::ListCards { .. }
        )
    }
}

/// Result of an [`Operation`], one variant per result shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Outcome {
    Boards { boards: Vec<Board> },
    Columns { columns: Vec<Column> },
    Cards { cards: Vec<Card> },
    Board { board: Board },
    Column { column: Column },
    Card { card: Card },
    Removed { ok: bool },
}

impl<S: KanbanStore, G: IdGenerator, C: Clock> KanbanService<S, G, C> {
    /// Route a named operation to its handler.
    pub fn execute(&self, op: Operation) -> Result<Outcome, CoreError> {
        let outcome = match op {
            Operation::ListBoards { id } => Outcome::Boards {
                boards: self.list_boards(id.as_deref())?,
            },
            Operation::ListColumns { board } => Outcome::Columns {
                columns: self.list_columns(board.as_deref())?,
            },
            Operation::ListCards { column } => Outcome::Cards {
                cards: self.list_cards(column.as_deref())?,
            },
            Operation::AddBoard { title } => Outcome::Board {
                board: self.add_board(NewBoard { title })?,
            },
            Operation::AddColumn {
                title,
                board,
                order,
            } => Outcome::Column {
                column: self.add_column(NewColumn {
                    title,
                    board,
                    order,
                })?,
            },
            Operation::AddCard {
                title,
                content,
                column,
            } => Outcome::Card {
                card: self.add_card(NewCard {
                    title,
                    content,
                    column,
                })?,
            },
            Operation::UpdateCard { id, column } => Outcome::Card {
                card: self.update_card(&id, &column)?,
            },
            Operation::EditCard { id, title, content } => Outcome::Card {
                card: self.edit_card(&id, &title, &content)?,
            },
            Operation::RemoveCard { id } => Outcome::Removed {
                ok: self.remove_card(&id)?,
            },
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::{InMemoryStore, SequentialIds};

    struct TestClock;
    impl Clock for TestClock {
        fn timestamp(&self) -> String {
            "2024-05-06 07:08:09.101112".into()
        }
    }

    fn svc() -> KanbanService<InMemoryStore, SequentialIds, TestClock> {
        KanbanService::new(InMemoryStore::new(), SequentialIds::new("id"), TestClock)
    }

    #[test]
    fn parses_tagged_json() {
        let op: Operation =
            serde_json::from_str(r#"{"op":"addColumn","title":"Todo","board":"b1","order":3}"#)
                .unwrap();
        assert_eq!(
            op,
            Operation::AddColumn {
                title: "Todo".into(),
                board: "b1".into(),
                order: 3
            }
        );
        assert_eq!(op.name(), "addColumn");
        assert!(op.is_mutation());
    }

    #[test]
    fn optional_filters_default_to_none() {
        let op: Operation = serde_json::from_str(r#"{"op":"columns"}"#).unwrap();
        assert_eq!(op, Operation::ListColumns { board: None });
        assert!(!op.is_mutation());
    }

    #[test]
    fn unknown_op_is_rejected() {
        let res: Result<Operation, _> = serde_json::from_str(r#"{"op":"dropBoard","id":"x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn execute_routes_to_handlers() {
        let svc = svc();
        let board = match svc
            .execute(Operation::AddBoard {
                title: "Sprint".into(),
            })
            .unwrap()
        {
            Outcome::Board { board } => board,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let card = match svc
            .execute(Operation::AddCard {
                title: "Write docs".into(),
                content: "README".into(),
                column: "todo".into(),
            })
            .unwrap()
        {
            Outcome::Card { card } => card,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let moved = svc
            .execute(Operation::UpdateCard {
                id: card.id.clone(),
                column: "done".into(),
            })
            .unwrap();
        assert!(matches!(moved, Outcome::Card { ref card } if card.column == "done"));

        let boards = svc
            .execute(Operation::ListBoards {
                id: Some(board.id.clone()),
            })
            .unwrap();
        assert_eq!(boards, Outcome::Boards { boards: vec![board] });

        let removed = svc.execute(Operation::RemoveCard { id: card.id }).unwrap();
        assert_eq!(removed, Outcome::Removed { ok: true });
    }

    #[test]
    fn execute_propagates_not_found() {
        let err = svc()
            .execute(Operation::EditCard {
                id: "ghost".into(),
                title: "t".into(),
                content: "c".into(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn outcome_serializes_with_op_tag() {
        let json = serde_json::to_value(Outcome::Removed { ok: true }).unwrap();
        assert_eq!(json, serde_json::json!({"op": "removed", "ok": true}));
    }
}
