pub use commands::{
    AdjustmentCmd, ChargeFeesCmd, CollectPaymentCmd, DiscountCmd, FeeLine, OpeningBalanceCmd,
};
pub use entries::{EntryDraft, EntryKey, EntryType, LedgerEntry, ReferenceType, next_balance};
pub use error::EngineError;
pub use events::LedgerEvent;
pub use ops::{Engine, EngineBuilder, PaymentOutcome};
pub use receipts::Receipt;
pub use sessions::Session;
pub use students::Student;

mod commands;
mod entries;
mod error;
mod events;
mod ops;
mod receipts;
mod sessions;
mod students;

type ResultEngine<T> = Result<T, EngineError>;
