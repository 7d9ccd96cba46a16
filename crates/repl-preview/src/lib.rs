//! Preview side of the sfc-repl pipeline.
//!
//! [`compile_modules`] turns the store's compiled files into a module
//! registry keyed by normalized names, rewriting relative `require`s to
//! those keys. [`PreviewChannel`] ships the result to an execution context
//! and relays its `ready`/`error`/`console` feedback.

pub mod channel;
pub mod message;
pub mod module_compiler;

pub use channel::{
    ChannelError, ContextPort, ExecutionContext, PreviewChannel, PreviewEvent,
    DEFAULT_READY_TIMEOUT,
};
pub use message::{ConsoleLevel, ConsoleMessage, EvalPayload, PreviewError, PreviewMessage};
pub use module_compiler::{
    compile_modules, compile_store, import_map_script, module_key, resolve, CompiledModules,
    ResolutionWarning,
};
