//=========================================================================
// Aetheric Runtime: Library Root
//
// This crate defines the composition runtime of the Aetheric Engine.
//
// Responsibilities:
// - Expose the engine facade (`Engine`, `EngineBuilder`)
// - Expose the dependency injector and the manager/service/signal
//   contracts applications implement
// - Keep the Winit host behind a small public surface (`WindowHost`)
//
// Typical usage:
// ```no_run
// use aetheric_runtime::prelude::*;
//
// fn main() -> Result<(), EngineError> {
//     init_logging(LoggingConfig::default());
//     EngineBuilder::new().build().run(&toml::Table::new())
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the injector, the manager contract, signals and the
// engine configuration. Applications mostly go through the prelude.
//
pub mod core;
pub mod logging;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `platform` contains the Winit integration (window, event loop, frame
// pacing). Only the host types are re-exported.
//
// `engine` defines the main engine entry point and frame scheduler.
//
mod engine;
mod platform;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder, EngineError, EngineState};
pub use platform::{HostCommand, HostError, HostHandle, WindowHost};
