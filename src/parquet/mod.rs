//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod events;

pub use events::save_events;
