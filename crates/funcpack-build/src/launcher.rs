//! Generated function entry point and runtime bridge.

use funcpack_core::ContentRef;

pub const LAUNCHER_FILE: &str = "launcher.js";
pub const BRIDGE_FILE: &str = "bridge.js";

/// Handler reference for bundles built around [`LAUNCHER_FILE`].
pub const HANDLER: &str = "launcher.launcher";

/// Built-in launcher template.
pub const LAUNCHER_TEMPLATE: &str = include_str!("../templates/launcher.js");

const BRIDGE_SOURCE: &str = include_str!("../templates/bridge.js");

const SUFFIX_PLACEHOLDER: &str = "__FRAMEWORK_SUFFIX__";
const CONFIG_PLACEHOLDER: &str = "__CONFIG_PATH__";

/// Values substituted into a launcher template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherParams {
    /// Framework variant suffix, e.g. `""` or `"-edge"`.
    pub framework_suffix: String,
    /// Config file path relative to the bundle root.
    pub config_path: String,
}

impl LauncherParams {
    /// Render `template` with these parameters.
    pub fn render(&self, template: &str) -> String {
        template
            .replace(SUFFIX_PLACEHOLDER, &self.framework_suffix)
            .replace(CONFIG_PLACEHOLDER, &self.config_path)
    }

    /// Bundle paths the rendered launcher loads at execution time.
    pub fn references(&self) -> Vec<String> {
        vec![BRIDGE_FILE.to_owned(), self.config_path.clone()]
    }
}

pub fn bridge() -> ContentRef {
    ContentRef::inline(BRIDGE_SOURCE)
}
