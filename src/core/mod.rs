// Domain-layer modules and shared errors/models
pub mod classifier {
    pub use crate::classifier::*;
}

pub mod encoding {
    pub use crate::encoding::*;
}

pub mod loader {
    pub use crate::loader::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod service {
    pub use crate::service::*;
}

pub mod errors {
    pub use crate::errors::*;
}
