/*!
Interactive command layer.

Directory Layout:
  src/cmd/
    mod.rs          (this file)
    command.rs      (Command enum: vocabulary + prompt)
    dispatch.rs     (CommandTable + Dispatcher loop, Flow / Exit)
    handlers.rs     (one handler per command)
    shared.rs       (messages, server resolution, effective values)
    format.rs       (banner / color)

Conventions:
  - Handlers share one signature: `fn(&dyn Meta, &mut dyn Console) -> Result<Flow>`.
  - Handlers never print errors themselves; the dispatcher does.
  - All operator input and output goes through `Console`.
*/

pub mod command;
pub mod dispatch;
pub mod format;
pub mod handlers;
pub mod shared;

#[cfg(test)]
pub mod fake;

pub use dispatch::Dispatcher;
