pub mod inventory_store;

pub use inventory_store::{InventoryStore, listings_to_dataframe};
