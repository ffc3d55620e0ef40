use crate::storage::Pool;
use crate::triage::Resolver;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub resolver: Resolver,
}
