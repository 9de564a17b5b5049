//! `folio render` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_cache::{Cache, FileCache, NullCache};
use folio_config::{CliSettings, Config};
use folio_markup::{HtmlRenderer, ParseOptions, parse_document, scene_sources};
use folio_scene::{RenderOptions, SceneCache, ZoomLimits};
use rayon::prelude::*;

use crate::error::{CliError, read_input};
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Document to render.
    file: PathBuf,

    /// Print HTML instead of the JSON render tree.
    #[arg(long)]
    html: bool,

    /// Keep the first H1 in the body and table of contents.
    #[arg(long)]
    no_title: bool,

    /// Disable the persistent scene cache.
    #[arg(long)]
    no_cache: bool,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    pub(crate) fn execute(self, output: &Output, version: &str) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            extract_title: self.no_title.then_some(false),
            cache_enabled: self.no_cache.then_some(false),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let text = read_input(&self.file)?;

        let cache = scene_cache(&config, version);
        let sources = scene_sources(&text);
        sources.par_iter().for_each(|raw| {
            let _ = cache.get_or_decode(raw);
        });
        tracing::info!(scenes = sources.len(), "decoded diagram scenes");

        let options = ParseOptions::default()
            .with_extract_title(config.render.extract_title)
            .with_scene_cache(&cache);
        let doc = parse_document(&text, &options);
        for warning in &doc.warnings {
            output.warning(&format!("warning: {warning}"));
        }

        let rendered = if self.html {
            HtmlRenderer::new()
                .with_scene_options(RenderOptions {
                    padding: config.scene.padding,
                })
                .with_zoom_limits(ZoomLimits {
                    min: config.scene.zoom_min,
                    max: config.scene.zoom_max,
                })
                .render(&doc)
        } else {
            serde_json::to_string_pretty(&doc)?
        };
        output.result(&rendered)?;
        Ok(())
    }
}

/// Scene memo for one run, backed by the on-disk cache when enabled.
fn scene_cache(config: &Config, version: &str) -> SceneCache {
    let backend: Box<dyn Cache> = if config.cache_resolved.enabled {
        tracing::info!(dir = %config.cache_resolved.dir.display(), "using scene cache");
        Box::new(FileCache::new(config.cache_resolved.dir.clone(), version))
    } else {
        Box::new(NullCache)
    };
    SceneCache::new().with_bucket(backend.bucket("scenes"))
}
