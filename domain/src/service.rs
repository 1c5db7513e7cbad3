use crate::{
    Board, Card, Clock, Column, CoreError, IdGenerator, KanbanStore, NewBoard, NewCard, NewColumn,
};

/// Application service implementing the board, column and card operations.
///
/// Generic over the store, id generator and clock so the domain stays
/// testable without external dependencies. Updates are fetch-modify-replace
/// with no concurrency token: two concurrent writers to one card race and
/// the last put wins.
pub struct KanbanService<S: KanbanStore, G: IdGenerator, C: Clock> {
    store: S,
    ids: G,
    clock: C,
}

impl<S: KanbanStore, G: IdGenerator, C: Clock> KanbanService<S, G, C> {
    pub fn new(store: S, ids: G, clock: C) -> Self {
        Self { store, ids, clock }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// List boards; with an id this is a point lookup returning 0 or 1 items.
    pub fn list_boards(&self, id: Option<&str>) -> Result<Vec<Board>, CoreError> {
        match id {
            Some(id) => Ok(self.store.get_board(id)?.into_iter().collect()),
            None => self.store.scan_boards(),
        }
    }

    /// List columns, optionally for one board, sorted ascending by `order`.
    ///
    /// The sort is stable so columns sharing an order keep scan order.
    pub fn list_columns(&self, board: Option<&str>) -> Result<Vec<Column>, CoreError> {
        let mut columns = match board {
            Some(board) => self.store.scan_columns_by_board(board)?,
            None => self.store.scan_columns()?,
        };
        columns.sort_by_key(|c| c.order);
        Ok(columns)
    }

    /// List cards, optionally for one column. Unsorted.
    pub fn list_cards(&self, column: Option<&str>) -> Result<Vec<Card>, CoreError> {
        match column {
            Some(column) => self.store.scan_cards_by_column(column),
            None => self.store.scan_cards(),
        }
    }

    pub fn add_board(&self, input: NewBoard) -> Result<Board, CoreError> {
        let board = Board {
            id: self.ids.next_id(),
            title: input.title,
        };
        self.store.put_board(&board)?;
        Ok(board)
    }

    /// Create a column. The referenced board is not checked.
    pub fn add_column(&self, input: NewColumn) -> Result<Column, CoreError> {
        let column = Column {
            id: self.ids.next_id(),
            title: input.title,
            board: input.board,
            order: input.order,
        };
        self.store.put_column(&column)?;
        Ok(column)
    }

    /// Create a card stamped with the current server time.
    pub fn add_card(&self, input: NewCard) -> Result<Card, CoreError> {
        let card = Card {
            id: self.ids.next_id(),
            title: input.title,
            content: input.content,
            column: input.column,
            created: self.clock.timestamp(),
        };
        self.store.put_card(&card)?;
        Ok(card)
    }

    /// Move a card to another column.
    pub fn update_card(&self, id: &str, column: &str) -> Result<Card, CoreError> {
        self.replace_card(id, |card| card.column = column.to_string())
    }

    /// Change a card's title and content.
    pub fn edit_card(&self, id: &str, title: &str, content: &str) -> Result<Card, CoreError> {
        self.replace_card(id, |card| {
            card.title = title.to_string();
            card.content = content.to_string();
        })
    }

    /// Delete a card. Unknown ids are a no-op and still report success.
    pub fn remove_card(&self, id: &str) -> Result<bool, CoreError> {
        self.store.delete_card(id)?;
        Ok(true)
    }

    fn replace_card<F>(&self, id: &str, apply: F) -> Result<Card, CoreError>
    where
        F: FnOnce(&mut Card),
    {
        let mut card = self
            .store
            .get_card(id)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "card",
                id: id.to_string(),
            })?;
        apply(&mut card);
        self.store.put_card(&card)?;
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::{InMemoryStore, SequentialIds};
    use crate::{BoardRepository, CardRepository, ColumnRepository};
    use std::sync::Mutex;

    struct TestClock;
    impl Clock for TestClock {
        fn timestamp(&self) -> String {
            "2024-01-02 03:04:05.000006".to_string()
        }
    }

    /// Wraps the in-memory store and records every card write.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryStore,
        card_puts: Mutex<Vec<Card>>,
        card_deletes: Mutex<Vec<String>>,
    }

    impl RecordingStore {
        fn card_puts(&self) -> Vec<Card> {
            self.card_puts.lock().unwrap().clone()
        }

        fn card_deletes(&self) -> Vec<String> {
            self.card_deletes.lock().unwrap().clone()
        }
    }

    impl BoardRepository for RecordingStore {
        fn get_board(&self, id: &str) -> Result<Option<Board>, CoreError> {
            self.inner.get_board(id)
        }
        fn scan_boards(&self) -> Result<Vec<Board>, CoreError> {
            self.inner.scan_boards()
        }
        fn put_board(&self, board: &Board) -> Result<(), CoreError> {
            self.inner.put_board(board)
        }
        fn delete_board(&self, id: &str) -> Result<(), CoreError> {
            self.inner.delete_board(id)
        }
    }

    impl ColumnRepository for RecordingStore {
        fn get_column(&self, id: &str) -> Result<Option<Column>, CoreError> {
            self.inner.get_column(id)
        }
        fn scan_columns(&self) -> Result<Vec<Column>, CoreError> {
            self.inner.scan_columns()
        }
        fn scan_columns_by_board(&self, board: &str) -> Result<Vec<Column>, CoreError> {
            self.inner.scan_columns_by_board(board)
        }
        fn put_column(&self, column: &Column) -> Result<(), CoreError> {
            self.inner.put_column(column)
        }
        fn delete_column(&self, id: &str) -> Result<(), CoreError> {
            self.inner.delete_column(id)
        }
    }

    impl CardRepository for RecordingStore {
        fn get_card(&self, id: &str) -> Result<Option<Card>, CoreError> {
            self.inner.get_card(id)
        }
        fn scan_cards(&self) -> Result<Vec<Card>, CoreError> {
            self.inner.scan_cards()
        }
        fn scan_cards_by_column(&self, column: &str) -> Result<Vec<Card>, CoreError> {
            self.inner.scan_cards_by_column(column)
        }
        fn put_card(&self, card: &Card) -> Result<(), CoreError> {
            self.card_puts.lock().unwrap().push(card.clone());
            self.inner.put_card(card)
        }
        fn delete_card(&self, id: &str) -> Result<(), CoreError> {
            self.card_deletes.lock().unwrap().push(id.to_string());
            self.inner.delete_card(id)
        }
    }

    fn svc() -> KanbanService<RecordingStore, SequentialIds, TestClock> {
        KanbanService::new(RecordingStore::default(), SequentialIds::new("id"), TestClock)
    }

    fn stored_card(svc: &KanbanService<RecordingStore, SequentialIds, TestClock>) -> Card {
        let card = Card {
            id: "123".into(),
            title: "test card".into(),
            content: "test content".into(),
            column: "old_column".into(),
            created: "test date".into(),
        };
        svc.store().inner.put_card(&card).unwrap();
        card
    }

    #[test]
    fn add_board_generates_unique_ids() {
        let svc = svc();
        let a = svc.add_board(NewBoard { title: "Test Board".into() }).unwrap();
        let b = svc.add_board(NewBoard { title: "Test Board".into() }).unwrap();
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "Test Board");
        assert_eq!(svc.list_boards(None).unwrap().len(), 2);
    }

    #[test]
    fn list_boards_by_id_is_point_lookup() {
        let svc = svc();
        let board = svc.add_board(NewBoard { title: "One".into() }).unwrap();
        svc.add_board(NewBoard { title: "Two".into() }).unwrap();

        assert_eq!(svc.list_boards(Some(&board.id)).unwrap(), vec![board]);
        assert!(svc.list_boards(Some("missing")).unwrap().is_empty());
    }

    #[test]
    fn add_column_persists_fields_verbatim() {
        let svc = svc();
        let column = svc
            .add_column(NewColumn {
                title: "Test Column".into(),
                board: "board_id".into(),
                order: 1,
            })
            .unwrap();
        let stored = svc.store().get_column(&column.id).unwrap().unwrap();
        assert_eq!(stored, column);
        assert_eq!(stored.board, "board_id");
        assert_eq!(stored.order, 1);
    }

    #[test]
    fn list_columns_filters_by_board_and_sorts_by_order() {
        let svc = svc();
        for order in [2, 0, 1] {
            svc.add_column(NewColumn {
                title: format!("col {}", order),
                board: "b1".into(),
                order,
            })
            .unwrap();
        }
        svc.add_column(NewColumn {
            title: "elsewhere".into(),
            board: "b2".into(),
            order: -1,
        })
        .unwrap();

        let columns = svc.list_columns(Some("b1")).unwrap();
        let orders: Vec<i32> = columns.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(columns.iter().all(|c| c.board == "b1"));

        assert_eq!(svc.list_columns(None).unwrap()[0].title, "elsewhere");
    }

    #[test]
    fn list_columns_keeps_scan_order_for_equal_orders() {
        let svc = svc();
        for title in ["first", "second", "third"] {
            svc.add_column(NewColumn {
                title: title.into(),
                board: "b1".into(),
                order: 0,
            })
            .unwrap();
        }
        let titles: Vec<String> = svc
            .list_columns(Some("b1"))
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn add_card_stamps_created() {
        let svc = svc();
        let card = svc
            .add_card(NewCard {
                title: "Test Card".into(),
                content: "test content".into(),
                column: "column_id".into(),
            })
            .unwrap();
        assert!(!card.created.is_empty());
        assert_ne!(card.created, card.title);
        assert_ne!(card.created, card.content);
        assert_eq!(svc.store().card_puts(), vec![card]);
    }

    #[test]
    fn list_cards_filters_by_column() {
        let svc = svc();
        for column in ["a", "b", "a"] {
            svc.add_card(NewCard {
                title: "t".into(),
                content: "c".into(),
                column: column.into(),
            })
            .unwrap();
        }
        assert_eq!(svc.list_cards(Some("a")).unwrap().len(), 2);
        assert_eq!(svc.list_cards(None).unwrap().len(), 3);
        assert!(svc.list_cards(Some("none")).unwrap().is_empty());
    }

    #[test]
    fn update_card_replaces_only_column() {
        let svc = svc();
        let before = stored_card(&svc);

        let updated = svc.update_card("123", "new_column").unwrap();

        assert_eq!(updated.column, "new_column");
        assert_eq!(updated.title, before.title);
        assert_eq!(updated.content, before.content);
        assert_eq!(updated.created, before.created);
        assert_eq!(svc.store().card_puts(), vec![updated]);
    }

    #[test]
    fn update_card_missing_is_not_found_without_put() {
        let svc = svc();
        let err = svc.update_card("missing", "new_column").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "card", ref id } if id == "missing"));
        assert!(svc.store().card_puts().is_empty());
    }

    #[test]
    fn edit_card_replaces_title_and_content() {
        let svc = svc();
        let before = stored_card(&svc);

        let edited = svc.edit_card("123", "new title", "new content").unwrap();

        assert_eq!(edited.title, "new title");
        assert_eq!(edited.content, "new content");
        assert_eq!(edited.column, before.column);
        assert_eq!(edited.created, before.created);
        assert_eq!(svc.store().card_puts(), vec![edited]);
    }

    #[test]
    fn remove_card_deletes_once_regardless_of_existence() {
        let svc = svc();
        assert!(svc.remove_card("123").unwrap());
        assert_eq!(svc.store().card_deletes(), vec!["123".to_string()]);

        stored_card(&svc);
        assert!(svc.remove_card("123").unwrap());
        assert!(svc.store().get_card("123").unwrap().is_none());
    }
}
