//! CLI command implementations.

mod document;
pub(crate) mod render;
pub(crate) mod status;

pub(crate) use render::RenderArgs;
pub(crate) use status::StatusArgs;
