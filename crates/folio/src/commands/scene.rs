//! `folio scene` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_config::{CliSettings, Config};
use folio_scene::{RenderOptions, decode, render_scene, to_svg};

use crate::error::{CliError, read_input};
use crate::output::Output;

/// Arguments for the scene command.
#[derive(Args)]
pub(crate) struct SceneArgs {
    /// Scene file: plain JSON, a fenced document, or a compressed payload.
    file: PathBuf,

    /// Print SVG instead of the JSON primitive list.
    #[arg(long)]
    svg: bool,

    /// Margin around the scene bounds (overrides config).
    #[arg(long)]
    padding: Option<f64>,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl SceneArgs {
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            padding: self.padding,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let text = read_input(&self.file)?;

        let scene = decode(&text)?;
        let rendered = render_scene(
            &scene,
            &RenderOptions {
                padding: config.scene.padding,
            },
        );
        tracing::info!(
            elements = scene.elements.len(),
            view_box = %rendered.view_box.to_view_box_attr(),
            "rendered scene"
        );

        let out = if self.svg {
            to_svg(&rendered)
        } else {
            serde_json::to_string_pretty(&rendered)?
        };
        output.result(&out)?;
        Ok(())
    }
}
