//! Compiler configuration
//!
//! Read from an `ecompile.cfg` style file: one `Key Value` property per
//! line, `#` or `//` comment lines, optionally wrapped in `{ }`. Keys are
//! case-insensitive. Directory values are normalized to forward slashes
//! with a trailing `/`.

use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use serde::Serialize;

use crate::file_contents::{FileContents, FileError};

/// Environment variable overriding the default module directory.
pub const MODULE_DIRECTORY_ENV: &str = "ECOMPILE_PATH_EM";
/// Environment variable overriding the default include directory.
pub const INCLUDE_DIRECTORY_ENV: &str = "ECOMPILE_PATH_INC";

#[derive(Debug, Display, Error, From)]
pub enum ConfigError {
    #[display("{_0}")]
    File(FileError),

    #[display("{}:{line}: expected 'Key Value', found '{text}'", path.display())]
    #[from(ignore)]
    Syntax {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[display("{}: property '{key}' is required", path.display())]
    #[from(ignore)]
    MissingProperty { path: PathBuf, key: &'static str },

    #[display("{}: property '{key}' has invalid boolean value '{value}'", path.display())]
    #[from(ignore)]
    InvalidBool {
        path: PathBuf,
        key: &'static str,
        value: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings consumed by the script compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompilerConfig {
    pub package_root: Vec<String>,
    pub include_directory: String,
    pub module_directory: String,
    pub pol_script_root: String,
    pub generate_listing: bool,
    pub generate_debug_info: bool,
    pub generate_debug_text_info: bool,
    pub display_warnings: bool,
    pub compile_asp_pages: bool,
    pub auto_compile_by_default: bool,
    pub update_only_on_auto_compile: bool,
    pub only_compile_updated_scripts: bool,
    pub display_summary: bool,
    pub optimize_object_members: bool,
    pub error_on_warning: bool,
    pub generate_dependency_info: bool,
    pub display_up_to_date_scripts: bool,
    pub threaded_compilation: bool,
    pub paranoia_warnings: bool,
}

impl CompilerConfig {
    /// Configuration with every flag at its default and no directories.
    pub fn new() -> Self {
        Self {
            package_root: Vec::new(),
            include_directory: String::new(),
            module_directory: String::new(),
            pol_script_root: String::new(),
            generate_listing: false,
            generate_debug_info: false,
            generate_debug_text_info: false,
            display_warnings: false,
            compile_asp_pages: false,
            auto_compile_by_default: false,
            update_only_on_auto_compile: false,
            only_compile_updated_scripts: false,
            display_summary: false,
            optimize_object_members: true,
            error_on_warning: false,
            generate_dependency_info: false,
            display_up_to_date_scripts: true,
            threaded_compilation: false,
            paranoia_warnings: false,
        }
    }

    /// Defaults used when no configuration file is given.
    ///
    /// The module and include directories come from `ECOMPILE_PATH_EM` and
    /// `ECOMPILE_PATH_INC`, falling back to the working directory. The script
    /// root follows the include directory.
    pub fn from_env() -> Self {
        let working_dir = std::env::current_dir()
            .map(|dir| normalized_dir_form(&dir.to_string_lossy()))
            .unwrap_or_else(|_| "./".to_string());
        Self::from_lookup(|name| std::env::var(name).ok(), &working_dir)
    }

    /// [`CompilerConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, working_dir: &str) -> Self {
        let dir_or_default = |name: &str| {
            lookup(name)
                .map(|dir| normalized_dir_form(&dir))
                .unwrap_or_else(|| working_dir.to_string())
        };
        let include_directory = dir_or_default(INCLUDE_DIRECTORY_ENV);
        Self::new()
            .with_module_directory(&dir_or_default(MODULE_DIRECTORY_ENV))
            .with_pol_script_root(&include_directory)
            .with_include_directory(&include_directory)
    }

    /// Load a configuration file.
    pub fn read(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = FileContents::open(path)?;
        Self::parse(&contents.text(), path)
    }

    /// Parse configuration text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> ConfigResult<Self> {
        let mut props = Properties::parse(text, origin)?;

        let package_root = props
            .take_all("PackageRoot")
            .iter()
            .map(|dir| normalized_dir_form(dir))
            .collect();
        let include_directory = props
            .take("IncludeDirectory")
            .map(|dir| normalized_dir_form(&dir))
            .unwrap_or_default();
        let module_directory = normalized_dir_form(&props.require("ModuleDirectory")?);
        let pol_script_root = normalized_dir_form(&props.require("PolScriptRoot")?);
        let only_compile_updated_scripts = props.flag("OnlyCompileUpdatedScripts", false)?;

        let config = Self {
            package_root,
            include_directory,
            module_directory,
            pol_script_root,
            generate_listing: props.flag("GenerateListing", false)?,
            generate_debug_info: props.flag("GenerateDebugInfo", false)?,
            generate_debug_text_info: props.flag("GenerateDebugTextInfo", false)?,
            display_warnings: props.flag("DisplayWarnings", false)?,
            compile_asp_pages: props.flag("CompileAspPages", false)?,
            auto_compile_by_default: props.flag("AutoCompileByDefault", false)?,
            update_only_on_auto_compile: props.flag("UpdateOnlyOnAutoCompile", false)?,
            only_compile_updated_scripts,
            display_summary: props.flag("DisplaySummary", false)?,
            optimize_object_members: props.flag("OptimizeObjectMembers", true)?,
            error_on_warning: props.flag("ErrorOnWarning", false)?,
            generate_dependency_info: props
                .flag("GenerateDependencyInfo", only_compile_updated_scripts)?,
            display_up_to_date_scripts: props.flag("DisplayUpToDateScripts", true)?,
            threaded_compilation: props.flag("ThreadedCompilation", false)?,
            paranoia_warnings: props.flag("ParanoiaWarnings", false)?,
        };

        for (key, _, line) in &props.remaining {
            tracing::warn!(
                path = %origin.display(),
                line,
                key = %key,
                "Unused configuration property"
            );
        }
        Ok(config)
    }

    /// Render as configuration file text that [`CompilerConfig::parse`]
    /// reads back unchanged. Properties are sorted by name.
    pub fn to_cfg_string(&self) -> serde_json::Result<String> {
        let serde_json::Value::Object(properties) = serde_json::to_value(self)? else {
            return Ok(String::new());
        };
        let mut out = String::new();
        for (key, value) in properties {
            let values = match value {
                serde_json::Value::Array(items) => items,
                other => vec![other],
            };
            for value in values {
                let text = match value {
                    serde_json::Value::Bool(flag) => u8::from(flag).to_string(),
                    serde_json::Value::String(s) if s.is_empty() => continue,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                out.push_str(&format!("{key} {text}\n"));
            }
        }
        Ok(out)
    }

    pub fn with_package_root(mut self, dir: &str) -> Self {
        self.package_root.push(normalized_dir_form(dir));
        self
    }

    pub fn with_include_directory(mut self, dir: &str) -> Self {
        self.include_directory = normalized_dir_form(dir);
        self
    }

    pub fn with_module_directory(mut self, dir: &str) -> Self {
        self.module_directory = normalized_dir_form(dir);
        self
    }

    pub fn with_pol_script_root(mut self, dir: &str) -> Self {
        self.pol_script_root = normalized_dir_form(dir);
        self
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward slashes with exactly one trailing `/`. Empty stays empty.
pub fn normalized_dir_form(dir: &str) -> String {
    let mut normalized = dir.trim().replace('\\', "/");
    if !normalized.is_empty() && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Raw `Key Value` pairs in file order. Taking a property removes it.
struct Properties<'a> {
    origin: &'a Path,
    remaining: Vec<(String, String, usize)>,
}

impl<'a> Properties<'a> {
    fn parse(text: &str, origin: &'a Path) -> ConfigResult<Self> {
        let mut remaining = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            if line == "{" || line == "}" {
                continue;
            }
            let Some((key, value)) = line.split_once(char::is_whitespace) else {
                return Err(ConfigError::Syntax {
                    path: origin.to_path_buf(),
                    line: index + 1,
                    text: line.to_string(),
                });
            };
            remaining.push((key.to_string(), value.trim().to_string(), index + 1));
        }
        Ok(Self { origin, remaining })
    }

    fn take(&mut self, key: &str) -> Option<String> {
        let position = self
            .remaining
            .iter()
            .position(|(k, _, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.remaining.remove(position).1)
    }

    fn take_all(&mut self, key: &str) -> Vec<String> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.remaining)
            .into_iter()
            .partition(|(k, _, _)| k.eq_ignore_ascii_case(key));
        self.remaining = kept;
        taken.into_iter().map(|(_, value, _)| value).collect()
    }

    fn require(&mut self, key: &'static str) -> ConfigResult<String> {
        self.take(key).ok_or_else(|| ConfigError::MissingProperty {
            path: self.origin.to_path_buf(),
            key,
        })
    }

    fn flag(&mut self, key: &'static str, default: bool) -> ConfigResult<bool> {
        match self.take(key) {
            None => Ok(default),
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
                path: self.origin.to_path_buf(),
                key,
                value,
            }),
        }
    }
}
