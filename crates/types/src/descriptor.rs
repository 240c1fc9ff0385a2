//! Package descriptor: the YAML file format and its validated form

use crate::build::{validate_template, BuildStep, Placeholder};
use crate::version::PackageVersion;
use regex::Regex;
use serde::{Deserialize, Serialize};
use spkg_errors::{DescriptorError, Error};
use spkg_hash::{HashAlgorithm, IntegrityHash};
use std::path::Path;

const BUILD_PLACEHOLDERS: &[Placeholder] = &[
    Placeholder::Name,
    Placeholder::Version,
    Placeholder::Bin,
    Placeholder::Prefix,
    Placeholder::Source,
];

const TEST_PLACEHOLDERS: &[Placeholder] = &[
    Placeholder::Name,
    Placeholder::Version,
    Placeholder::Bin,
    Placeholder::Prefix,
];

/// Raw descriptor file as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorFile {
    pub metadata: Metadata,
    pub source: Source,
    #[serde(default)]
    pub dependencies: Dependencies,
    pub build: Vec<BuildStep>,
    pub test: TestSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// `algo:hex` form, alternative to `sha256`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Explicit version; derived from `url` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependencies {
    #[serde(default)]
    pub build: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_regex: Option<String>,
}

/// What the verification command's output must satisfy
#[derive(Debug, Clone)]
pub enum OutputExpectation {
    Contains(String),
    Matches(Regex),
}

impl OutputExpectation {
    #[must_use]
    pub fn is_satisfied_by(&self, output: &str) -> bool {
        match self {
            Self::Contains(needle) => output.contains(needle.as_str()),
            Self::Matches(re) => re.is_match(output),
        }
    }

    /// Pattern text as written in the descriptor
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Contains(needle) => needle,
            Self::Matches(re) => re.as_str(),
        }
    }
}

impl PartialEq for OutputExpectation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Contains(a), Self::Contains(b)) => a == b,
            (Self::Matches(a), Self::Matches(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Post-install smoke test
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSpec {
    /// Program followed by its arguments, placeholders unexpanded
    pub command: Vec<String>,
    pub expectation: OutputExpectation,
}

/// Immutable, validated description of one package version
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    pub name: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub source_url: String,
    pub integrity_hash: IntegrityHash,
    pub version: PackageVersion,
    /// Tool names in declaration order, duplicates removed
    pub build_dependencies: Vec<String>,
    pub build_instructions: Vec<BuildStep>,
    pub verification: VerificationSpec,
}

impl PackageDescriptor {
    /// Read and validate a descriptor file
    ///
    /// # Errors
    /// Returns `DescriptorError::ReadFailed` if the file cannot be read, or any
    /// parse/validation error from [`PackageDescriptor::from_yaml_str`].
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DescriptorError::ReadFailed {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self::from_yaml_str(&content)?)
    }

    /// Parse and validate descriptor YAML
    ///
    /// # Errors
    /// Returns a `DescriptorError` describing the first problem found.
    pub fn from_yaml_str(content: &str) -> Result<Self, DescriptorError> {
        let file: DescriptorFile = serde_yml::from_str(content)?;
        Self::try_from(file)
    }

    /// Default install location for the binary under `bin_dir`
    #[must_use]
    pub fn installed_path(&self, bin_dir: &Path) -> std::path::PathBuf {
        bin_dir.join(self.binary_name())
    }

    /// Name of the binary the build produces
    ///
    /// The last `go` step decides when it names an output; otherwise the
    /// package name is used.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        self.build_instructions
            .iter()
            .rev()
            .find_map(|step| match step {
                BuildStep::Go { go } => Some(go.output_name(&self.name)),
                BuildStep::Command { .. } => None,
            })
            .unwrap_or(self.name.as_str())
    }
}

impl TryFrom<DescriptorFile> for PackageDescriptor {
    type Error = DescriptorError;

    fn try_from(file: DescriptorFile) -> Result<Self, Self::Error> {
        let DescriptorFile {
            metadata,
            source,
            dependencies,
            build,
            test,
        } = file;

        validate_name(&metadata.name)?;
        require_text("metadata.description", &metadata.description)?;
        require_text("metadata.homepage", &metadata.homepage)?;
        require_text("metadata.license", &metadata.license)?;

        let parsed = url::Url::parse(&source.url)
            .map_err(|e| DescriptorError::invalid("source.url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https" | "file") {
            return Err(DescriptorError::invalid(
                "source.url",
                format!("unsupported scheme {:?}", parsed.scheme()),
            ));
        }

        let integrity_hash = match (&source.sha256, &source.checksum) {
            (Some(hex), None) => IntegrityHash::from_hex(HashAlgorithm::Sha256, hex)?,
            (None, Some(tagged)) => IntegrityHash::parse(tagged)?,
            (Some(_), Some(_)) => {
                return Err(DescriptorError::invalid(
                    "source",
                    "set either sha256 or checksum, not both",
                ))
            }
            (None, None) => {
                return Err(DescriptorError::invalid(
                    "source",
                    "an integrity hash (sha256 or checksum) is required",
                ))
            }
        };

        let version = match source.version {
            Some(explicit) => PackageVersion::new(explicit)?,
            None => PackageVersion::from_url(&source.url)?,
        };

        let mut build_dependencies: Vec<String> = Vec::new();
        for dep in dependencies.build {
            let dep = dep.trim().to_string();
            if dep.is_empty() || dep.contains(char::is_whitespace) {
                return Err(DescriptorError::invalid(
                    "dependencies.build",
                    format!("{dep:?} is not a tool name"),
                ));
            }
            if !build_dependencies.contains(&dep) {
                build_dependencies.push(dep);
            }
        }

        if build.is_empty() {
            return Err(DescriptorError::invalid(
                "build",
                "at least one build step is required",
            ));
        }
        for step in &build {
            validate_step(step)?;
        }

        let verification = validate_test(test)?;

        Ok(Self {
            name: metadata.name,
            description: metadata.description,
            homepage: metadata.homepage,
            license: metadata.license,
            source_url: source.url,
            integrity_hash,
            version,
            build_dependencies,
            build_instructions: build,
            verification,
        })
    }
}

fn require_text(field: &str, value: &str) -> Result<(), DescriptorError> {
    if value.trim().is_empty() {
        return Err(DescriptorError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), DescriptorError> {
    require_text("metadata.name", name)?;
    if name.starts_with('.')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
    {
        return Err(DescriptorError::invalid(
            "metadata.name",
            format!("{name:?} may only contain letters, digits, '.', '_', '+' and '-'"),
        ));
    }
    Ok(())
}

fn validate_step(step: &BuildStep) -> Result<(), DescriptorError> {
    match step {
        BuildStep::Go { go } => {
            if let Some(output) = &go.output {
                if output.is_empty() || output.contains('/') {
                    return Err(DescriptorError::invalid(
                        "build.go.output",
                        format!("{output:?} must be a plain file name"),
                    ));
                }
            }
            if let Some(symbol) = &go.version_symbol {
                if symbol.is_empty() || symbol.contains(char::is_whitespace) || symbol.contains('=')
                {
                    return Err(DescriptorError::invalid(
                        "build.go.version_symbol",
                        format!("{symbol:?} is not a Go symbol path"),
                    ));
                }
            }
            for value in go.env.values() {
                validate_template(value, BUILD_PLACEHOLDERS)?;
            }
            Ok(())
        }
        BuildStep::Command { command: cmd } => {
            require_text("build.command.program", &cmd.program)?;
            validate_template(&cmd.program, BUILD_PLACEHOLDERS)?;
            for arg in &cmd.args {
                validate_template(arg, BUILD_PLACEHOLDERS)?;
            }
            for value in cmd.env.values() {
                validate_template(value, BUILD_PLACEHOLDERS)?;
            }
            Ok(())
        }
    }
}

fn validate_test(test: TestSpec) -> Result<VerificationSpec, DescriptorError> {
    let Some(program) = test.command.first() else {
        return Err(DescriptorError::invalid(
            "test.command",
            "must name a program",
        ));
    };
    require_text("test.command", program)?;
    for part in &test.command {
        validate_template(part, TEST_PLACEHOLDERS)?;
    }

    let expectation = match (test.expect, test.expect_regex) {
        (Some(needle), None) => {
            require_text("test.expect", &needle)?;
            OutputExpectation::Contains(needle)
        }
        (None, Some(pattern)) => {
            let re = Regex::new(&pattern)
                .map_err(|e| DescriptorError::invalid("test.expect_regex", e.to_string()))?;
            OutputExpectation::Matches(re)
        }
        (Some(_), Some(_)) => {
            return Err(DescriptorError::invalid(
                "test",
                "set either expect or expect_regex, not both",
            ))
        }
        (None, None) => {
            return Err(DescriptorError::invalid(
                "test",
                "an expected output pattern (expect or expect_regex) is required",
            ))
        }
    };

    Ok(VerificationSpec {
        command: test.command,
        expectation,
    })
}
