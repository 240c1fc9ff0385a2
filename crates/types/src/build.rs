//! Build instructions and version substitution
//!
//! Build steps are declared in the descriptor; [`BuildOptions`] holds every
//! value that may be substituted into them, one field per placeholder.

use crate::version::PackageVersion;
use serde::{Deserialize, Serialize};
use spkg_errors::DescriptorError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One ordered build action, written as a single-key map (`go:` or `command:`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildStep {
    /// `go build` with structured flags
    Go { go: GoBuild },
    /// Arbitrary program invocation with placeholder expansion
    Command { command: CommandStep },
}

impl BuildStep {
    /// Program this step invokes, before placeholder expansion
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Go { .. } => "go",
            Self::Command { command } => &command.program,
        }
    }
}

/// Structured `go build` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoBuild {
    /// Package path to build
    #[serde(default = "default_go_package")]
    pub package: String,
    /// Output binary name; defaults to the package name
    #[serde(default)]
    pub output: Option<String>,
    /// Linker flags, without `-X` version injection
    #[serde(default)]
    pub ldflags: Vec<String>,
    /// Fully qualified variable receiving the version via `-X`
    #[serde(default)]
    pub version_symbol: Option<String>,
    #[serde(default = "default_true")]
    pub trimpath: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_go_package() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GoBuild {
    fn default() -> Self {
        Self {
            package: default_go_package(),
            output: None,
            ldflags: Vec::new(),
            version_symbol: None,
            trimpath: true,
            tags: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

impl GoBuild {
    /// Complete `-ldflags` value with the version injected
    ///
    /// ```
    /// use spkg_types::{GoBuild, PackageVersion};
    ///
    /// let go = GoBuild {
    ///     ldflags: vec!["-s".into(), "-w".into()],
    ///     version_symbol: Some("main.version".into()),
    ///     ..GoBuild::default()
    /// };
    /// let version = PackageVersion::new("0.3.0").unwrap();
    /// assert_eq!(go.ldflags_for(&version), "-s -w -X main.version=0.3.0");
    /// ```
    #[must_use]
    pub fn ldflags_for(&self, version: &PackageVersion) -> String {
        let mut flags = self.ldflags.clone();
        if let Some(symbol) = &self.version_symbol {
            flags.push("-X".to_string());
            flags.push(format!("{symbol}={version}"));
        }
        flags.join(" ")
    }

    /// Binary name the build writes into `{bin}`
    #[must_use]
    pub fn output_name<'a>(&'a self, package_name: &'a str) -> &'a str {
        self.output.as_deref().unwrap_or(package_name)
    }
}

/// Generic build command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandStep {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Placeholders accepted in command templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    Version,
    Bin,
    Prefix,
    Source,
}

impl Placeholder {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "version" => Some(Self::Version),
            "bin" => Some(Self::Bin),
            "prefix" => Some(Self::Prefix),
            "source" => Some(Self::Source),
            _ => None,
        }
    }
}

/// Values substituted into build and test commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub name: String,
    pub version: PackageVersion,
    /// Directory binaries are written to (`{bin}`)
    pub bin_dir: PathBuf,
    /// Install prefix (`{prefix}`); `bin_dir` normally lives under it
    pub prefix: PathBuf,
    /// Extracted source root (`{source}`); absent after the build stage
    pub source_dir: Option<PathBuf>,
}

impl BuildOptions {
    /// Options for the build stage, writing into `staging/bin`
    #[must_use]
    pub fn for_build(
        name: impl Into<String>,
        version: PackageVersion,
        source_dir: PathBuf,
        staging: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            bin_dir: staging.join("bin"),
            prefix: staging,
            source_dir: Some(source_dir),
        }
    }

    /// Options for post-install verification against the live bin directory
    #[must_use]
    pub fn for_installed(
        name: impl Into<String>,
        version: PackageVersion,
        prefix: PathBuf,
        bin_dir: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            bin_dir,
            prefix,
            source_dir: None,
        }
    }

    fn value(&self, placeholder: Placeholder) -> Option<String> {
        match placeholder {
            Placeholder::Name => Some(self.name.clone()),
            Placeholder::Version => Some(self.version.to_string()),
            Placeholder::Bin => Some(self.bin_dir.display().to_string()),
            Placeholder::Prefix => Some(self.prefix.display().to_string()),
            Placeholder::Source => self.source_dir.as_ref().map(|p| p.display().to_string()),
        }
    }

    /// Replace `{placeholder}` occurrences in `template`
    ///
    /// # Errors
    /// Returns `UnknownPlaceholder` for names outside [`Placeholder`] or for
    /// placeholders that have no value at this stage.
    pub fn expand(&self, template: &str) -> Result<String, DescriptorError> {
        expand_with(template, |placeholder| self.value(placeholder))
    }
}

/// Check `template` only uses placeholders from `allowed`
///
/// # Errors
/// Returns `UnknownPlaceholder` naming the first offending placeholder.
pub fn validate_template(template: &str, allowed: &[Placeholder]) -> Result<(), DescriptorError> {
    expand_with(template, |placeholder| {
        allowed.contains(&placeholder).then(String::new)
    })
    .map(|_| ())
}

fn expand_with<F>(template: &str, mut lookup: F) -> Result<String, DescriptorError>
where
    F: FnMut(Placeholder) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // unmatched brace is literal text
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let key = &after[..close];
        let value = Placeholder::parse(key)
            .and_then(&mut lookup)
            .ok_or_else(|| DescriptorError::UnknownPlaceholder {
                placeholder: key.to_string(),
                context: template.to_string(),
            })?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> BuildOptions {
        BuildOptions::for_build(
            "itsyhome",
            PackageVersion::new("0.3.0").unwrap(),
            PathBuf::from("/work/src"),
            PathBuf::from("/work/stage"),
        )
    }

    #[test]
    fn test_expand_all_placeholders() {
        let opts = options();
        assert_eq!(
            opts.expand("{bin}/{name}-{version} in {source} under {prefix}")
                .unwrap(),
            "/work/stage/bin/itsyhome-0.3.0 in /work/src under /work/stage"
        );
    }

    #[test]
    fn test_expand_rejects_unknown() {
        let err = options().expand("{home}/bin").unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::UnknownPlaceholder { ref placeholder, .. } if placeholder == "home"
        ));
    }

    #[test]
    fn test_source_unavailable_after_build() {
        let opts = BuildOptions::for_installed(
            "itsyhome",
            PackageVersion::new("0.3.0").unwrap(),
            PathBuf::from("/usr/local"),
            PathBuf::from("/usr/local/bin"),
        );
        assert!(opts.expand("{source}").is_err());
        assert_eq!(opts.expand("{bin}/itsyhome").unwrap(), "/usr/local/bin/itsyhome");
    }

    #[test]
    fn test_unmatched_brace_is_literal() {
        assert_eq!(options().expand("a{b").unwrap(), "a{b");
    }

    #[test]
    fn test_validate_template() {
        let allowed = [Placeholder::Bin, Placeholder::Name];
        assert!(validate_template("{bin}/{name}", &allowed).is_ok());
        assert!(validate_template("{source}", &allowed).is_err());
    }

    #[test]
    fn test_ldflags_without_symbol() {
        let go = GoBuild {
            ldflags: vec!["-s".into()],
            ..GoBuild::default()
        };
        assert_eq!(go.ldflags_for(&PackageVersion::new("1").unwrap()), "-s");
        assert_eq!(go.output_name("itsyhome"), "itsyhome");
    }
}
