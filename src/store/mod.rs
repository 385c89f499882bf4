//! Application state shared across pages: the cart, the toast queue, the
//! listing filters and the storage they persist to.

mod cart;
mod search;
mod storage;
mod toast;

pub use cart::{decode as decode_cart, CartEntry, CartEvent, CartStore, CART_SCHEMA_VERSION};
pub use search::{PageLimit, SearchParams, SortOrder};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use toast::{Toast, ToastEvent, ToastId, ToastKind, ToastQueue};
