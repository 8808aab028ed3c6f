pub mod api_connection;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod meal_ledger;
pub mod numeric_extractor;
pub mod operation_state;
pub mod recipe_book;
pub mod recommendation;
pub mod session;

pub use error::{TrackerError, ValidationError};
pub use session::DietSession;
