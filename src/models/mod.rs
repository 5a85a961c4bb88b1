pub mod event;
pub mod game;
pub mod pool_change;
pub mod signature;

pub use event::{DomainEvent, GameSettledEvent, PoolAction, PoolChangeEvent};
pub use game::SettledGame;
pub use pool_change::PoolChange;
pub use signature::SignatureRecord;
