//! `folio assets` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_markup::{AssetManifest, preprocess, render_manifest};

use crate::error::{CliError, read_input};
use crate::output::Output;

/// Arguments for the assets command.
#[derive(Args)]
pub(crate) struct AssetsArgs {
    /// Document whose `:::assets` manifest is extended.
    file: PathBuf,

    /// URLs to allocate tokens for.
    #[arg(required = true)]
    urls: Vec<String>,
}

impl AssetsArgs {
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let text = read_input(&self.file)?;
        let (manifest, tokens) = allocate_tokens(&text, &self.urls);

        for (url, token) in self.urls.iter().zip(&tokens) {
            output.success(&format!("asset:{token}  {url}"));
        }
        output.result(&render_manifest(&manifest))?;
        Ok(())
    }
}

/// Extend the document's manifest with `urls`. Returns the manifest and the
/// token of each URL, in order.
fn allocate_tokens(text: &str, urls: &[String]) -> (AssetManifest, Vec<String>) {
    let mut manifest = preprocess(text).manifest;
    let tokens = urls.iter().map(|url| manifest.allocate(url)).collect();
    (manifest, tokens)
}
