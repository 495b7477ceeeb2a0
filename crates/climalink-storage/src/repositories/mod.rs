pub mod reading;

pub use reading::{ReadingRepository, SqliteReadingRepository};
