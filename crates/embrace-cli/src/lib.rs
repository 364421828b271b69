//! Command-line plumbing for the `embrace` converter: file in, converted
//! file out, with the syntax tree supplied by the external parser as a
//! JSON sidecar.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use embrace_core::{convert, ConvertOptions, Conversion, JsonFrontEnd, SourceBuffer};

/// Everything the binary parses off the command line.
#[derive(Debug, Clone)]
pub struct CliOptions {
    pub input: PathBuf,
    /// Parser-emitted tree JSON. Defaults to `<input>.tree.json`.
    pub tree: Option<PathBuf>,
    /// Output path; stdout when absent.
    pub out: Option<PathBuf>,
    /// Where to write the rendered position map, if anywhere.
    pub map_out: Option<PathBuf>,
    pub literate: bool,
}

impl CliOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            tree: None,
            out: None,
            map_out: None,
            literate: false,
        }
    }

    fn tree_path(&self) -> PathBuf {
        self.tree.clone().unwrap_or_else(|| {
            let mut name = self.input.as_os_str().to_owned();
            name.push(".tree.json");
            PathBuf::from(name)
        })
    }
}

/// Run one conversion: read the source and its tree sidecar, drive the
/// pipeline, write whatever outputs were requested.
pub fn run(options: &CliOptions) -> Result<Conversion> {
    let source = fs::read_to_string(&options.input)
        .with_context(|| format!("failed to read {}", options.input.display()))?;
    let tree_path = options.tree_path();
    let tree_json = fs::read_to_string(&tree_path)
        .with_context(|| format!("failed to read tree sidecar {}", tree_path.display()))?;
    let front_end = JsonFrontEnd::from_json(&tree_json)
        .with_context(|| format!("invalid tree sidecar {}", tree_path.display()))?;

    let filename = options.input.to_string_lossy();
    let conversion = convert(
        &source,
        Some(filename.as_ref()),
        Box::new(front_end),
        &ConvertOptions {
            literate: options.literate,
        },
    )?;
    info!(
        suggestions = conversion.suggestions.len(),
        out_len = conversion.code.len(),
        "conversion finished"
    );

    if let Some(out) = &options.out {
        write_file(out, &conversion.code)?;
    }
    if let Some(map_out) = &options.map_out {
        let rendered = conversion.map.render(
            &SourceBuffer::new(source),
            &conversion.code,
            Some(filename.as_ref()),
        );
        let json = serde_json::to_string_pretty(&rendered)?;
        write_file(map_out, &json)?;
    }
    Ok(conversion)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
