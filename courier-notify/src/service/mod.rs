pub mod wire;

pub use wire::{ApplicationContext, PlatformBindings, initialize, initialize_with};
