//! DynamoDB adapter implementing the board, column and card ports.
//!
//! Production implementation backed by `aws-sdk-dynamodb`.
//! - Three tables (`board`, `column`, `card` by default), each keyed on the
//!   string attribute `id`.
//! - Filtered scans use a `FilterExpression` on the secondary attribute; there
//!   are no secondary indexes.
//! - Scans follow `LastEvaluatedKey` until the table is exhausted.
//! - Provides `from_env()` wiring using `DYNAMO_TABLE_BOARD`,
//!   `DYNAMO_TABLE_COLUMN`, `DYNAMO_TABLE_CARD`, `DYNAMO_ENDPOINT_URL` and
//!   `DYNAMO_REGION`.
//!
//! Notes:
//! - The domain ports are synchronous. We bridge to the async AWS SDK using an
//!   internal `tokio::runtime::Runtime` and `block_on`.

use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::{types::AttributeValue, Client};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use domain::{Board, BoardRepository, Card, CardRepository, Column, ColumnRepository, CoreError};
use std::collections::HashMap;
use tracing::warn;

type Item = HashMap<String, AttributeValue>;

/// Table names plus client overrides.
#[derive(Clone, Debug)]
pub struct DynamoTables {
    pub boards: String,
    pub columns: String,
    pub cards: String,
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub endpoint_url: Option<String>,
    pub region: String,
}

impl Default for DynamoTables {
    fn default() -> Self {
        Self {
            boards: "board".into(),
            columns: "column".into(),
            cards: "card".into(),
            endpoint_url: None,
            region: "us-west-2".into(),
        }
    }
}

impl DynamoTables {
    /// Build from environment variables; every variable is optional.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; `from_env` passes `std::env`.
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            boards: lookup("DYNAMO_TABLE_BOARD").unwrap_or(defaults.boards),
            columns: lookup("DYNAMO_TABLE_COLUMN").unwrap_or(defaults.columns),
            cards: lookup("DYNAMO_TABLE_CARD").unwrap_or(defaults.cards),
            endpoint_url: lookup("DYNAMO_ENDPOINT_URL").filter(|s| !s.is_empty()),
            region: lookup("DYNAMO_REGION").unwrap_or(defaults.region),
        }
    }
}

/// Equality filter for a scan, as the expression parts DynamoDB expects.
#[derive(Debug, PartialEq)]
struct ScanFilter {
    expression: String,
    names: HashMap<String, String>,
    values: Item,
}

// `column` and `order` are reserved words, so the attribute name is always aliased.
fn scan_filter(attr: &str, value: &str) -> ScanFilter {
    ScanFilter {
        expression: "#attr = :value".into(),
        names: HashMap::from([("#attr".to_string(), attr.to_string())]),
        values: HashMap::from([(":value".to_string(), AttributeValue::S(value.to_string()))]),
    }
}

/// Start key for the next scan page, or `None` once the table is exhausted.
fn next_start_key(last_evaluated: Option<&Item>) -> Option<Item> {
    last_evaluated.filter(|k| !k.is_empty()).cloned()
}

/// Store backed by AWS DynamoDB.
///
/// Supports both standalone mode (creates its own Tokio runtime) and server
/// mode (reuses the existing runtime via `Handle::current()`).
#[derive(Clone)]
pub struct DynamoRepo {
    table_boards: String,
    table_columns: String,
    table_cards: String,
    client: Client,
    // None when running inside an existing runtime
    rt: Option<std::sync::Arc<tokio::runtime::Runtime>>,
}

impl DynamoRepo {
    /// Construct with table names and a default AWS SDK client using env/IMDS
    /// credentials, honouring the endpoint and region overrides.
    pub fn new(tables: DynamoTables) -> Result<Self, CoreError> {
        let rt = Self::maybe_create_runtime()?;
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(tables.region.clone()));
        if let Some(url) = tables.endpoint_url.clone() {
            loader = loader.endpoint_url(url);
        }
        let conf = Self::block_on_with_rt(&rt, loader.load());
        let client = Client::new(&conf);
        Ok(Self {
            table_boards: tables.boards,
            table_columns: tables.columns,
            table_cards: tables.cards,
            client,
            rt,
        })
    }

    /// Construct from environment variables (see module docs).
    pub fn from_env() -> Result<Self, CoreError> {
        Self::new(DynamoTables::from_env())
    }

    /// Check if we're inside a Tokio runtime. If yes, return None (reuse existing).
    /// If no, create a new runtime.
    fn maybe_create_runtime() -> Result<Option<std::sync::Arc<tokio::runtime::Runtime>>, CoreError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            Ok(None)
        } else {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .map_err(|e| CoreError::Repository(format!("tokio runtime init: {e}")))?;
            Ok(Some(std::sync::Arc::new(rt)))
        }
    }

    /// Run an async future, using either our owned runtime or the current runtime.
    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        Self::block_on_with_rt(&self.rt, fut)
    }

    fn block_on_with_rt<F: std::future::Future>(rt: &Option<std::sync::Arc<tokio::runtime::Runtime>>, fut: F) -> F::Output {
        match rt {
            Some(rt) => rt.block_on(fut),
            None => {
                // Inside an existing (multi-thread) runtime: block_in_place + Handle::current()
                tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current().block_on(fut)
                })
            }
        }
    }

    fn get_item(&self, table: &str, id: &str) -> Result<Option<Item>, CoreError> {
        let fut = async {
            self.client.get_item()
                .table_name(table)
                .key("id", AttributeValue::S(id.to_string()))
                .send().await
        };
        let out = self.block_on(fut).map_err(map_sdk_err)?;
        Ok(out.item().cloned())
    }

    fn put_item(&self, table: &str, item: Item) -> Result<(), CoreError> {
        // Unconditional put: replaces any record with the same id
        let fut = async {
            self.client.put_item()
                .table_name(table)
                .set_item(Some(item))
                .send().await
        };
        self.block_on(fut).map_err(map_sdk_err)?;
        Ok(())
    }

    fn delete_item(&self, table: &str, id: &str) -> Result<(), CoreError> {
        let fut = async {
            self.client.delete_item()
                .table_name(table)
                .key("id", AttributeValue::S(id.to_string()))
                .send().await
        };
        self.block_on(fut).map_err(map_sdk_err)?;
        Ok(())
    }

    /// Scan a whole table, optionally keeping only items where `attr == value`.
    fn scan_items(
        &self,
        table: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<Item>, CoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let start = start_key.take();
            let parts = filter.map(|(attr, value)| scan_filter(attr, value));
            let fut = async {
                let mut req = self.client.scan()
                    .table_name(table)
                    .set_exclusive_start_key(start);
                if let Some(f) = parts {
                    req = req
                        .filter_expression(f.expression)
                        .set_expression_attribute_names(Some(f.names))
                        .set_expression_attribute_values(Some(f.values));
                }
                req.send().await
            };
            let out = self.block_on(fut).map_err(map_sdk_err)?;
            items.extend(out.items().iter().cloned());
            start_key = next_start_key(out.last_evaluated_key());
            if start_key.is_none() {
                break;
            }
        }
        Ok(items)
    }
}

/// Map items, skipping (and logging) the ones that do not fit the shape.
fn map_items<T>(table: &str, items: Vec<Item>, f: fn(&Item) -> Result<T, CoreError>) -> Vec<T> {
    items
        .iter()
        .filter_map(|it| match f(it) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(table = %table, err = %e, "skipping malformed item");
                None
            }
        })
        .collect()
}

impl BoardRepository for DynamoRepo {
    fn get_board(&self, id: &str) -> Result<Option<Board>, CoreError> {
        self.get_item(&self.table_boards, id)?
            .map(|item| item_to_board(&item))
            .transpose()
    }

    fn scan_boards(&self) -> Result<Vec<Board>, CoreError> {
        let items = self.scan_items(&self.table_boards, None)?;
        Ok(map_items(&self.table_boards, items, item_to_board))
    }

    fn put_board(&self, board: &Board) -> Result<(), CoreError> {
        self.put_item(&self.table_boards, board_to_item(board))
    }

    fn delete_board(&self, id: &str) -> Result<(), CoreError> {
        self.delete_item(&self.table_boards, id)
    }
}

impl ColumnRepository for DynamoRepo {
    fn get_column(&self, id: &str) -> Result<Option<Column>, CoreError> {
        self.get_item(&self.table_columns, id)?
            .map(|item| item_to_column(&item))
            .transpose()
    }

    fn scan_columns(&self) -> Result<Vec<Column>, CoreError> {
        let items = self.scan_items(&self.table_columns, None)?;
        Ok(map_items(&self.table_columns, items, item_to_column))
    }

    fn scan_columns_by_board(&self, board: &str) -> Result<Vec<Column>, CoreError> {
        let items = self.scan_items(&self.table_columns, Some(("board", board)))?;
        Ok(map_items(&self.table_columns, items, item_to_column))
    }

    fn put_column(&self, column: &Column) -> Result<(), CoreError> {
        self.put_item(&self.table_columns, column_to_item(column))
    }

    fn delete_column(&self, id: &str) -> Result<(), CoreError> {
        self.delete_item(&self.table_columns, id)
    }
}

impl CardRepository for DynamoRepo {
    fn get_card(&self, id: &str) -> Result<Option<Card>, CoreError> {
        self.get_item(&self.table_cards, id)?
            .map(|item| item_to_card(&item))
            .transpose()
    }

    fn scan_cards(&self) -> Result<Vec<Card>, CoreError> {
        let items = self.scan_items(&self.table_cards, None)?;
        Ok(map_items(&self.table_cards, items, item_to_card))
    }

    fn scan_cards_by_column(&self, column: &str) -> Result<Vec<Card>, CoreError> {
        let items = self.scan_items(&self.table_cards, Some(("column", column)))?;
        Ok(map_items(&self.table_cards, items, item_to_card))
    }

    fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        self.put_item(&self.table_cards, card_to_item(card))
    }

    fn delete_card(&self, id: &str) -> Result<(), CoreError> {
        self.delete_item(&self.table_cards, id)
    }
}

fn map_sdk_err<E: ProvideErrorMetadata + std::fmt::Display>(e: E) -> CoreError {
    if let Some(code) = e.code() {
        if code == "ResourceNotFoundException" { return CoreError::Repository("missing table".into()); }
    }
    CoreError::Repository(format!("dynamo error: {e}"))
}

fn get_s(item: &Item, attr: &str, entity: &str) -> Result<String, CoreError> {
    item.get(attr)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| CoreError::Repository(format!("{entity} item missing {attr}")))
}

fn board_to_item(board: &Board) -> Item {
    let mut m = HashMap::new();
    m.insert("id".into(), AttributeValue::S(board.id.clone()));
    m.insert("title".into(), AttributeValue::S(board.title.clone()));
    m
}

fn item_to_board(item: &Item) -> Result<Board, CoreError> {
    Ok(Board {
        id: get_s(item, "id", "board")?,
        title: get_s(item, "title", "board")?,
    })
}

fn column_to_item(column: &Column) -> Item {
    let mut m = HashMap::new();
    m.insert("id".into(), AttributeValue::S(column.id.clone()));
    m.insert("title".into(), AttributeValue::S(column.title.clone()));
    m.insert("board".into(), AttributeValue::S(column.board.clone()));
    m.insert("order".into(), AttributeValue::N(column.order.to_string()));
    m
}

fn item_to_column(item: &Item) -> Result<Column, CoreError> {
    // Older items may lack `order`; they sort as 0
    let order = match item.get("order").and_then(|v| v.as_n().ok()) {
        Some(n) => n
            .parse::<i32>()
            .map_err(|e| CoreError::Repository(format!("bad column order {n:?}: {e}")))?,
        None => 0,
    };
    Ok(Column {
        id: get_s(item, "id", "column")?,
        title: get_s(item, "title", "column")?,
        board: get_s(item, "board", "column")?,
        order,
    })
}

fn card_to_item(card: &Card) -> Item {
    let mut m = HashMap::new();
    m.insert("id".into(), AttributeValue::S(card.id.clone()));
    m.insert("title".into(), AttributeValue::S(card.title.clone()));
    m.insert("content".into(), AttributeValue::S(card.content.clone()));
    m.insert("column".into(), AttributeValue::S(card.column.clone()));
    m.insert("created".into(), AttributeValue::S(card.created.clone()));
    m
}

fn item_to_card(item: &Item) -> Result<Card, CoreError> {
    Ok(Card {
        id: get_s(item, "id", "card")?,
        title: get_s(item, "title", "card")?,
        content: get_s(item, "content", "card")?,
        column: get_s(item, "column", "card")?,
        created: get_s(item, "created", "card")?,
    })
}
