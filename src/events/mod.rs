//! Event bus and model event payloads.

mod bus;
mod event;

pub use bus::{EventBus, ListenerFn, ListenerId};
pub use event::{
    ModelEvent, FIELD_CHANGE, FIELD_NOT_FOUND, REACTION_ERROR, VALIDATION_COMPLETE,
    VALIDATION_ERROR,
};
