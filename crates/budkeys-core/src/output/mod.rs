// Budkeys Output Layer
// Synthetic key emission for re-emitted events and action output

mod sink;
mod state;

#[cfg(feature = "evdev-backend")]
mod uinput;

pub use sink::{KeySink, UInputError};
pub use state::PressedKeys;

#[cfg(feature = "evdev-backend")]
pub use uinput::{VirtualDevice, VIRTUAL_DEVICE_NAME};
