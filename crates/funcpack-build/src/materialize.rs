//! Writes a [`FileManifest`] to disk.

use std::path::{Component, Path};

use funcpack_core::FileManifest;

use crate::error::SourceError;

/// Write every manifest entry below `dest`, creating parent directories.
///
/// Entry paths are normalized (`.` segments and backslashes); any path that
/// would leave `dest` is rejected. Partial output is left behind on failure.
pub fn materialize(manifest: &FileManifest, dest: &Path) -> Result<(), SourceError> {
    for (raw, content) in manifest.iter() {
        let relative = normalize_relative(raw)?;
        let target = dest.join(&relative);
        content.write_to(&target).map_err(|e| SourceError::Write {
            path: target.clone(),
            source: e,
        })?;
    }

    tracing::debug!(dest = %dest.display(), files = manifest.len(), "materialized source");
    Ok(())
}

/// Normalize a manifest path to a clean POSIX relative path.
pub fn normalize_relative(raw: &str) -> Result<String, SourceError> {
    let unified = raw.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(s) => parts.push(s),
                None => {
                    return Err(SourceError::InvalidPath {
                        path: raw.to_owned(),
                    });
                }
            },
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(SourceError::PathEscape {
                        path: raw.to_owned(),
                    });
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SourceError::PathEscape {
                    path: raw.to_owned(),
                });
            }
        }
    }

    if parts.is_empty() {
        return Err(SourceError::InvalidPath {
            path: raw.to_owned(),
        });
    }
    Ok(parts.join("/"))
}

/// Whether `name` can be used as one file name without leaving its directory.
pub fn is_single_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize_relative("./pages/index.vue").unwrap(), "pages/index.vue");
        assert_eq!(normalize_relative("a/b/../c.txt").unwrap(), "a/c.txt");
        assert_eq!(normalize_relative("a\\b.txt").unwrap(), "a/b.txt");
    }

    #[test]
    fn single_segment_names() {
        assert!(is_single_segment("index"));
        assert!(is_single_segment("api.v2"));
        for bad in ["", ".", "..", "../x", "a/b", "a\\b", "/abs"] {
            assert!(!is_single_segment(bad), "{bad:?}");
        }
    }

    #[test]
    fn rejects_escapes() {
        assert!(matches!(
            normalize_relative("../etc/passwd"),
            Err(SourceError::PathEscape { .. })
        ));
        assert!(matches!(
            normalize_relative("a/../../b"),
            Err(SourceError::PathEscape { .. })
        ));
        assert!(matches!(
            normalize_relative("/etc/passwd"),
            Err(SourceError::PathEscape { .. })
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            normalize_relative("./"),
            Err(SourceError::InvalidPath { .. })
        ));
    }

    mod proptests {
        use super::*;
        use funcpack_core::FileManifest;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn segment() -> impl Strategy<Value = String> {
            "[a-z0-9_]{1,8}(\\.[a-z]{1,3})?"
        }

        fn relative_path() -> impl Strategy<Value = String> {
            proptest::collection::vec(segment(), 1..4).prop_map(|parts| parts.join("/"))
        }

        proptest! {
            #[test]
            fn materialize_round_trips(
                files in proptest::collection::btree_map(relative_path(), ".{0,64}", 1..12)
            ) {
                // a path that is also a directory of another path cannot coexist
                let paths: Vec<&String> = files.keys().collect();
                prop_assume!(!paths.iter().any(|a| paths.iter().any(|b| b.starts_with(&format!("{a}/")))));

                let mut manifest = FileManifest::new();
                for (path, content) in &files {
                    manifest.insert(path.clone(), funcpack_core::ContentRef::inline(content.as_bytes()));
                }
                let tmp = tempfile::TempDir::new().unwrap();
                materialize(&manifest, tmp.path()).unwrap();

                let read: BTreeMap<String, String> = walkdir::WalkDir::new(tmp.path())
                    .into_iter()
                    .map(Result::unwrap)
                    .filter(|e| e.file_type().is_file())
                    .map(|e| {
                        let rel = e.path().strip_prefix(tmp.path()).unwrap();
                        let rel = rel.to_string_lossy().replace('\\', "/");
                        (rel, std::fs::read_to_string(e.path()).unwrap())
                    })
                    .collect();
                prop_assert_eq!(read, files);
            }

            #[test]
            fn normalized_paths_stay_relative(raw in "[a-z./\\\\]{0,24}") {
                if let Ok(path) = normalize_relative(&raw) {
                    prop_assert!(!path.is_empty());
                    prop_assert!(!path.starts_with('/'));
                    prop_assert!(!path.split('/').any(|s| s == ".." || s == "." || s.is_empty()));
                }
            }
        }
    }
}
