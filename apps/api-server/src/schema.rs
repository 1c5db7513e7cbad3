//! GraphQL schema: one Query root and one Mutation root over `AppService`.
//!
//! Mutations answer with payload objects (`addBoard { board { .. } }`,
//! `removeCard { ok }`) because that is the shape existing clients select.

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Object, Schema, SimpleObject, ID};
use domain::{CoreError, NewBoard, NewCard, NewColumn};
use tracing::{error, info, instrument, warn};

use crate::state::AppService;

pub type KanbanSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the shared service as context data.
pub fn build_schema(service: Arc<AppService>) -> KanbanSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

#[derive(SimpleObject)]
#[graphql(name = "Board")]
pub struct BoardObject {
    id: ID,
    title: String,
}

impl From<domain::Board> for BoardObject {
    fn from(b: domain::Board) -> Self {
        Self {
            id: ID(b.id),
            title: b.title,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Column")]
pub struct ColumnObject {
    id: ID,
    title: String,
    board: String,
    order: i32,
}

impl From<domain::Column> for ColumnObject {
    fn from(c: domain::Column) -> Self {
        Self {
            id: ID(c.id),
            title: c.title,
            board: c.board,
            order: c.order,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Card")]
pub struct CardObject {
    id: ID,
    title: String,
    content: String,
    column: String,
    /// Human-readable creation time; not a parseable timestamp.
    created: String,
}

impl From<domain::Card> for CardObject {
    fn from(c: domain::Card) -> Self {
        Self {
            id: ID(c.id),
            title: c.title,
            content: c.content,
            column: c.column,
            created: c.created,
        }
    }
}

#[derive(SimpleObject)]
pub struct AddBoardPayload {
    board: BoardObject,
}

#[derive(SimpleObject)]
pub struct AddColumnPayload {
    column: ColumnObject,
}

#[derive(SimpleObject)]
pub struct CardPayload {
    card: CardObject,
}

#[derive(SimpleObject)]
pub struct RemoveCardPayload {
    ok: bool,
}

/// Turn a domain error into a GraphQL error carrying an extension `code`.
fn gql_err(e: CoreError) -> async_graphql::Error {
    let code = match &e {
        CoreError::NotFound { entity, id } => {
            warn!(entity = %entity, id = %id, "target not found");
            "NOT_FOUND"
        }
        CoreError::Repository(msg) => {
            error!(err = %msg, "storage error");
            "STORAGE"
        }
    };
    async_graphql::Error::new(e.to_string()).extend_with(|_, ext| ext.set("code", code))
}

fn service<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<AppService>> {
    ctx.data::<Arc<AppService>>()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All boards, or the board with `id` (zero or one item).
    #[instrument(skip_all)]
    async fn boards(
        &self,
        ctx: &Context<'_>,
        id: Option<ID>,
    ) -> async_graphql::Result<Vec<BoardObject>> {
        let boards = service(ctx)?
            .list_boards(id.as_ref().map(|i| i.as_str()))
            .map_err(gql_err)?;
        Ok(boards.into_iter().map(Into::into).collect())
    }

    /// Columns, optionally of one board, ascending by `order`.
    #[instrument(skip_all)]
    async fn columns(
        &self,
        ctx: &Context<'_>,
        board: Option<ID>,
    ) -> async_graphql::Result<Vec<ColumnObject>> {
        let columns = service(ctx)?
            .list_columns(board.as_ref().map(|b| b.as_str()))
            .map_err(gql_err)?;
        Ok(columns.into_iter().map(Into::into).collect())
    }

    /// Cards, optionally of one column.
    #[instrument(skip_all)]
    async fn cards(
        &self,
        ctx: &Context<'_>,
        column: Option<ID>,
    ) -> async_graphql::Result<Vec<CardObject>> {
        let cards = service(ctx)?
            .list_cards(column.as_ref().map(|c| c.as_str()))
            .map_err(gql_err)?;
        Ok(cards.into_iter().map(Into::into).collect())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Creates a new board.
    #[instrument(skip_all)]
    async fn add_board(
        &self,
        ctx: &Context<'_>,
        title: String,
    ) -> async_graphql::Result<AddBoardPayload> {
        let board = service(ctx)?
            .add_board(NewBoard { title })
            .map_err(gql_err)?;
        info!(id = %board.id, "board created");
        Ok(AddBoardPayload { board: board.into() })
    }

    /// Creates a column. `board` is stored as given and not checked.
    #[instrument(skip_all)]
    async fn add_column(
        &self,
        ctx: &Context<'_>,
        title: String,
        board: String,
        order: i32,
    ) -> async_graphql::Result<AddColumnPayload> {
        let column = service(ctx)?
            .add_column(NewColumn { title, board, order })
            .map_err(gql_err)?;
        info!(id = %column.id, board = %column.board, "column created");
        Ok(AddColumnPayload { column: column.into() })
    }

    /// Creates a card in `column`.
    #[instrument(skip_all)]
    async fn add_card(
        &self,
        ctx: &Context<'_>,
        title: String,
        content: String,
        column: String,
    ) -> async_graphql::Result<CardPayload> {
        let card = service(ctx)?
            .add_card(NewCard { title, content, column })
            .map_err(gql_err)?;
        info!(id = %card.id, column = %card.column, "card created");
        Ok(CardPayload { card: card.into() })
    }

    /// Moves a card to another column.
    #[instrument(skip_all)]
    async fn update_card(
        &self,
        ctx: &Context<'_>,
        id: ID,
        column: String,
    ) -> async_graphql::Result<CardPayload> {
        let card = service(ctx)?.update_card(&id, &column).map_err(gql_err)?;
        info!(id = %card.id, column = %card.column, "card moved");
        Ok(CardPayload { card: card.into() })
    }

    #[graphql(deprecation = "use updateCard")]
    async fn update_card_status(
        &self,
        ctx: &Context<'_>,
        id: ID,
        column: String,
    ) -> async_graphql::Result<CardPayload> {
        self.update_card(ctx, id, column).await
    }

    /// Replaces a card's title and content.
    #[instrument(skip_all)]
    async fn edit_card(
        &self,
        ctx: &Context<'_>,
        id: ID,
        title: String,
        content: String,
    ) -> async_graphql::Result<CardPayload> {
        let card = service(ctx)?
            .edit_card(&id, &title, &content)
            .map_err(gql_err)?;
        info!(id = %card.id, "card edited");
        Ok(CardPayload { card: card.into() })
    }

    /// Deletes a card. Reports `ok: true` even when the id did not exist.
    #[instrument(skip_all)]
    async fn remove_card(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<RemoveCardPayload> {
        let ok = service(ctx)?.remove_card(&id).map_err(gql_err)?;
        info!(id = %id.as_str(), "card removed");
        Ok(RemoveCardPayload { ok })
    }
}
