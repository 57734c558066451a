//! Fleet Engine
//!
//! The engine is a single actor task that owns the [`EntityStore`], the
//! [`ModeController`] and the advisory log. Everything else talks to it
//! through a cloneable [`EngineHandle`]:
//!
//! - **Writes** are commands on an mpsc mailbox, applied one at a time in
//!   arrival order and acknowledged over a oneshot channel.
//! - **Reads** never touch the mailbox. After every mutation the actor
//!   publishes an immutable [`FleetSnapshot`] through an `ArcSwap`, so readers
//!   always observe a complete state.
//! - **Notifications** go to subscribed callbacks, on the actor task, in
//!   mutation order.
//!
//! Dropping every handle (or calling [`EngineHandle::shutdown`]) tears the
//! engine down. The advisory worker holds only a weak mailbox sender and
//! discards whatever it was working on.
//!
//! [`EntityStore`]: crate::store::EntityStore
//! [`ModeController`]: crate::mode::ModeController
//! [`FleetSnapshot`]: crate::types::FleetSnapshot

mod actor;
mod events;
mod handle;

pub use actor::{EngineCommand, EngineSettings, FleetEngine};
pub use events::{FleetEvent, SubscriptionId};
pub use handle::EngineHandle;

use thiserror::Error;

use crate::advisory::AdvisoryError;
use crate::mode::ModeError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error(transparent)]
    Advisory(#[from] AdvisoryError),

    #[error("Fleet engine is not running")]
    Closed,
}
