pub mod account;
pub mod category;
pub mod currency;
pub mod money;
pub mod tag;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountId, LedgerError};
pub use category::{Category, CategoryId, CategoryType};
pub use money::Money;
pub use tag::{Tag, TagId};
pub use transaction::{AccountRef, CategoryRef, GeoLocation, ImportedTransaction, TagRef, TransactionType};
pub use user::UserContext;
