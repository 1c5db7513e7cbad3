use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::{
    Board, BoardRepository, Card, CardRepository, Column, ColumnRepository, CoreError, IdGenerator,
};

/// Simple in-memory store holding all three collections. Not tuned for high
/// concurrency beyond the internal mutexes guarding each map.
///
/// Scans return records in primary-key order.
pub struct InMemoryStore {
    boards: Mutex<BTreeMap<String, Board>>,
    columns: Mutex<BTreeMap<String, Column>>,
    cards: Mutex<BTreeMap<String, Card>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            boards: Mutex::new(BTreeMap::new()),
            columns: Mutex::new(BTreeMap::new()),
            cards: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, CoreError> {
    m.lock()
        .map_err(|_| CoreError::Repository("mutex poisoned".into()))
}

impl BoardRepository for InMemoryStore {
    fn get_board(&self, id: &str) -> Result<Option<Board>, CoreError> {
        Ok(lock(&self.boards)?.get(id).cloned())
    }

    fn scan_boards(&self) -> Result<Vec<Board>, CoreError> {
        Ok(lock(&self.boards)?.values().cloned().collect())
    }

    fn put_board(&self, board: &Board) -> Result<(), CoreError> {
        lock(&self.boards)?.insert(board.id.clone(), board.clone());
        Ok(())
    }

    fn delete_board(&self, id: &str) -> Result<(), CoreError> {
        lock(&self.boards)?.remove(id);
        Ok(())
    }
}

impl ColumnRepository for InMemoryStore {
    fn get_column(&self, id: &str) -> Result<Option<Column>, CoreError> {
        Ok(lock(&self.columns)?.get(id).cloned())
    }

    fn scan_columns(&self) -> Result<Vec<Column>, CoreError> {
        Ok(lock(&self.columns)?.values().cloned().collect())
    }

    fn scan_columns_by_board(&self, board: &str) -> Result<Vec<Column>, CoreError> {
        Ok(lock(&self.columns)?
            .values()
            .filter(|c| c.board == board)
            .cloned()
            .collect())
    }

    fn put_column(&self, column: &Column) -> Result<(), CoreError> {
        lock(&self.columns)?.insert(column.id.clone(), column.clone());
        Ok(())
    }

    fn delete_column(&self, id: &str) -> Result<(), CoreError> {
        lock(&self.columns)?.remove(id);
        Ok(())
    }
}

impl CardRepository for InMemoryStore {
    fn get_card(&self, id: &str) -> Result<Option<Card>, CoreError> {
        Ok(lock(&self.cards)?.get(id).cloned())
    }

    fn scan_cards(&self) -> Result<Vec<Card>, CoreError> {
        Ok(lock(&self.cards)?.values().cloned().collect())
    }

    fn scan_cards_by_column(&self, column: &str) -> Result<Vec<Card>, CoreError> {
        Ok(lock(&self.cards)?
            .values()
            .filter(|c| c.column == column)
            .cloned()
            .collect())
    }

    fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        lock(&self.cards)?.insert(card.id.clone(), card.clone());
        Ok(())
    }

    fn delete_card(&self, id: &str) -> Result<(), CoreError> {
        lock(&self.cards)?.remove(id);
        Ok(())
    }
}

/// Deterministic id generator: `<prefix>-000001`, `<prefix>-000002`, ...
///
/// Zero-padded so primary-key order matches creation order in the in-memory
/// store.
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:06}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_card(id: &str, column: &str) -> Card {
        Card {
            id: id.into(),
            title: "title".into(),
            content: "content".into(),
            column: column.into(),
            created: "2024-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn put_get_roundtrip() {
        let store = InMemoryStore::new();
        let card = mk_card("c1", "todo");
        store.put_card(&card).unwrap();
        assert_eq!(store.get_card("c1").unwrap(), Some(card));
        assert!(store.get_card("missing").unwrap().is_none());
    }

    #[test]
    fn put_replaces_existing_record() {
        let store = InMemoryStore::new();
        store.put_card(&mk_card("c1", "todo")).unwrap();
        store.put_card(&mk_card("c1", "done")).unwrap();
        let cards = store.scan_cards().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].column, "done");
    }

    #[test]
    fn delete_missing_is_noop() {
        let store = InMemoryStore::new();
        store.delete_card("nope").unwrap();
        store.delete_board("nope").unwrap();
        store.delete_column("nope").unwrap();
    }

    #[test]
    fn scan_filters_by_attribute() {
        let store = InMemoryStore::new();
        store.put_card(&mk_card("c1", "todo")).unwrap();
        store.put_card(&mk_card("c2", "done")).unwrap();
        store.put_card(&mk_card("c3", "todo")).unwrap();
        let ids: Vec<String> = store
            .scan_cards_by_column("todo")
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn sequential_ids_are_ordered() {
        let ids = SequentialIds::new("b");
        assert_eq!(ids.next_id(), "b-000001");
        assert_eq!(ids.next_id(), "b-000002");
    }
}
