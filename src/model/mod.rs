pub mod list;
pub mod settings;
pub mod task;

pub use list::*;
pub use settings::*;
pub use task::*;
