//! Record storage.

pub mod db {
    pub use crate::db::*;
}

pub mod sink {
    pub use crate::sink::*;
}
