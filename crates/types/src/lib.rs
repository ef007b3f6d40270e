pub mod event;
pub mod message;
pub mod plant;
pub mod policy;
pub mod swap;
pub mod views;
pub mod warning;

pub use event::*;
pub use message::*;
pub use plant::*;
pub use policy::*;
pub use swap::*;
pub use views::*;
pub use warning::*;
