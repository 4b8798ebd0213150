pub mod catalog;
pub mod codes;
pub mod drafts;
pub mod explosion;
pub mod health;

pub use catalog::*;
pub use codes::*;
pub use drafts::*;
pub use explosion::*;
pub use health::*;
