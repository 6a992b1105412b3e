//! Bundle assembly: union of generated, configured and collected files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use funcpack_core::{ArtifactMap, Collision, ContentRef, FunctionBundle};

use crate::collect::collect;
use crate::error::PackagingError;

/// Inputs for one function bundle.
#[derive(Debug, Clone)]
pub struct BundleInputs {
    pub entry: String,
    pub handler: String,
    pub runtime: String,
    pub env: BTreeMap<String, String>,
    /// Files synthesized for this bundle (launcher, bridge).
    pub generated: Vec<(String, ContentRef)>,
    pub config_files: ArtifactMap,
    pub server: ArtifactMap,
    pub dependencies: ArtifactMap,
    /// Extra globs evaluated against `include_root`.
    pub include_globs: Vec<String>,
    pub include_root: PathBuf,
    /// Paths the entry point loads at execution time.
    pub required: Vec<String>,
}

/// Union every input into one [`FunctionBundle`].
///
/// Generated, config, server and dependency files must be disjoint. Include
/// files may repeat an entry already present with identical content. Every
/// path in `required` must end up in the bundle.
pub fn assemble(inputs: BundleInputs) -> Result<FunctionBundle, PackagingError> {
    let mut files = ArtifactMap::new();
    for (path, content) in inputs.generated {
        files.insert(path, content)?;
    }
    files.merge(inputs.config_files)?;
    files.merge(inputs.server)?;
    files.merge(inputs.dependencies)?;

    for pattern in &inputs.include_globs {
        for (path, content) in collect(pattern, &inputs.include_root, "")? {
            match files.get(&path) {
                Some(existing) if *existing == content => {}
                Some(_) => return Err(Collision(path).into()),
                None => files.insert(path, content)?,
            }
        }
    }

    let missing: Vec<String> = inputs
        .required
        .into_iter()
        .filter(|path| !files.contains(path))
        .collect();
    if !missing.is_empty() {
        return Err(PackagingError::IncompleteBundle {
            entry: inputs.entry,
            missing,
        });
    }

    tracing::info!(
        entry = %inputs.entry,
        runtime = %inputs.runtime,
        files = files.len(),
        "assembled function bundle"
    );

    Ok(FunctionBundle {
        name: inputs.entry,
        handler: inputs.handler,
        runtime: inputs.runtime,
        env: inputs.env,
        files,
    })
}
