//! CLI command implementations.

pub(crate) mod assets;
pub(crate) mod render;
pub(crate) mod scene;

pub(crate) use assets::AssetsArgs;
pub(crate) use render::RenderArgs;
pub(crate) use scene::SceneArgs;
