use crate::{
    db::{DbPool, OrmConn},
    events::EventPublisher,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub events: EventPublisher,
}
