pub mod amount;
pub mod cell;
pub mod config;
pub mod date;
pub mod transaction;

pub use amount::{infer_currency, parse_amount};
pub use cell::{Cell, RawGrid};
pub use config::{PipelineConfig, ProviderConfig};
pub use date::{from_serial, resolve_date, resolve_date_str};
pub use transaction::{is_card_payment_text, Direction, Transaction};
