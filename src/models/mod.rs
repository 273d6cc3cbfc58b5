pub mod folder;
pub mod item;
pub mod user;

pub use folder::{Folder, FolderInput};
pub use item::{Item, ItemInput, ItemQuery, ItemUpdate};
pub use user::{Account, AccountSummary, ProfileUpdate};
