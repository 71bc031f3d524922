pub mod behavior;
pub mod entity;
pub mod event;
pub mod pending;

pub use behavior::{EcoBehavior, EntityContext};
pub use entity::EcoEntity;
pub use event::{EcoEntityListener, EcoEvent, ListenerId};
pub use pending::{PendingChanges, PendingGoal};
