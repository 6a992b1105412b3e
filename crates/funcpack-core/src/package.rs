use std::path::Path;

use serde_json::{Map, Value};

use crate::framework::ExclusionPolicy;

/// A JS package manifest (`package.json`), kept as a JSON document so that
/// fields the pipeline does not understand survive a rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    doc: Map<String, Value>,
}

impl PackageManifest {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::Error::ProjectManifestRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&content).map_err(|e| crate::Error::PackageJsonParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let doc = serde_json::from_str::<Map<String, Value>>(content)?;
        Ok(Self { doc })
    }

    /// Serialize deterministically (keys sorted) and write to `path`.
    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let mut content = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| crate::Error::PackageJsonWrite { source: e })?;
        content.push('\n');
        std::fs::write(path, content).map_err(|e| crate::Error::ProjectManifestWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.doc.get("name").and_then(Value::as_str)
    }

    /// `engines.node`, the declared runtime version range.
    pub fn engines_node(&self) -> Option<&str> {
        self.doc
            .get("engines")
            .and_then(|e| e.get("node"))
            .and_then(Value::as_str)
    }

    fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.doc.get(key).and_then(Value::as_object)
    }

    /// Version spec of a dependency declared in either dependency section.
    pub fn dependency(&self, name: &str) -> Option<&str> {
        ["dependencies", "devDependencies"]
            .iter()
            .filter_map(|key| self.section(key))
            .find_map(|deps| deps.get(name))
            .and_then(Value::as_str)
    }

    pub fn dependency_names(&self, key: &str) -> Vec<&str> {
        self.section(key)
            .map(|deps| deps.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Production variant of this manifest.
    ///
    /// Drops `devDependencies`, then applies `policy`: replaced packages keep
    /// their version spec under the new name, dropped packages disappear.
    /// The result depends only on the input and the policy.
    pub fn for_production(&self, policy: &ExclusionPolicy) -> Self {
        let mut doc = self.doc.clone();
        let dev = doc.remove("devDependencies");

        let mut deps = doc
            .get("dependencies")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        // Build-only tools declared as dev deps still need their runtime
        // replacement in production.
        if let Some(Value::Object(dev)) = dev {
            for (name, spec) in dev {
                if policy.replace.contains_key(&name) && !deps.contains_key(&name) {
                    deps.insert(name, spec);
                }
            }
        }

        for (from, to) in &policy.replace {
            if let Some(spec) = deps.remove(from) {
                deps.entry(to.clone()).or_insert(spec);
            }
        }
        for name in &policy.drop {
            deps.remove(name);
        }

        doc.insert("dependencies".to_owned(), Value::Object(deps));
        Self { doc }
    }
}
