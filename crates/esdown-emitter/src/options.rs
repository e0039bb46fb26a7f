//! Emission options.
//!
//! Options deserialize from JSON with every field optional:
//!
//! ```json
//! { "helper_import_style": "commonjs", "printer": { "indent_width": 2 } }
//! ```

use crate::transforms::ir_printer::PrinterOptions;
use serde::{Deserialize, Serialize};

/// How helper references are brought into scope at the top of a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperImportStyle {
    /// `import _x from "<prefix>_x<ext>";`
    #[default]
    #[serde(alias = "esm")]
    EsModule,
    /// `var _x = require("<prefix>_x<ext>");`
    #[serde(alias = "cjs")]
    CommonJs,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub helper_import_style: HelperImportStyle,
    pub helper_module_prefix: String,
    pub helper_module_extension: String,
    pub printer: PrinterOptions,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            helper_import_style: HelperImportStyle::EsModule,
            helper_module_prefix: "@swc/helpers/src/".to_string(),
            helper_module_extension: ".mjs".to_string(),
            printer: PrinterOptions::default(),
        }
    }
}

impl EmitOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Module specifier for a helper's local name: `@swc/helpers/src/_x.mjs`.
    pub fn helper_source(&self, local_name: &str) -> String {
        format!(
            "{}{}{}",
            self.helper_module_prefix, local_name, self.helper_module_extension
        )
    }
}
