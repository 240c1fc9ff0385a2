//! Integration tests for types

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use spkg_types::*;
    use std::path::PathBuf;

    fn descriptor_yaml(url: &str, build: &str) -> String {
        format!(
            r#"
metadata:
  name: hello
  description: test package
  homepage: https://example.com/hello
  license: MIT
source:
  url: {url}
  checksum: "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
dependencies:
  build: [sh, sh, tar]
build:
{build}
test:
  command: ["{{bin}}/hello", "--version"]
  expect_regex: "^hello [0-9.]+$"
"#
        )
    }

    #[tokio::test]
    async fn test_load_descriptor_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.yml");
        let yaml = descriptor_yaml(
            "https://example.com/hello-1.4.2.tar.gz",
            "  - command:\n      program: sh\n      args: [\"-c\", \"cp hello {bin}/hello\"]",
        );
        tokio::fs::write(&path, yaml).await.unwrap();

        let d = PackageDescriptor::load(&path).await.unwrap();
        assert_eq!(d.version.as_str(), "1.4.2");
        assert_eq!(d.build_dependencies, vec!["sh".to_string(), "tar".to_string()]);
        assert_eq!(d.binary_name(), "hello");
        assert!(d.verification.expectation.is_satisfied_by("hello 1.4.2"));
        assert!(!d.verification.expectation.is_satisfied_by("goodbye 1.4.2"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = PackageDescriptor::load(std::path::Path::new("/nonexistent/hello.yml"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), spkg_errors::ErrorKind::Descriptor);
    }

    #[tokio::test]
    async fn test_load_shipped_recipe() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../recipes/itsyhome.yml");
        let d = PackageDescriptor::load(&path).await.unwrap();

        assert_eq!(d.name, "itsyhome");
        assert_eq!(d.version.as_str(), "0.3.0");
        assert_eq!(d.build_dependencies, vec!["go".to_string()]);
        assert_eq!(d.binary_name(), "itsyhome");
        assert_eq!(d.build_instructions.len(), 1);
        assert_eq!(d.build_instructions[0].program(), "go");
        let BuildStep::Go { go } = &d.build_instructions[0] else {
            panic!("expected a go step");
        };
        assert_eq!(go.ldflags_for(&d.version), "-s -w -X main.version=0.3.0");
        assert_eq!(
            d.verification.command,
            vec!["{bin}/itsyhome".to_string(), "--help".to_string()]
        );
    }

    #[test]
    fn test_build_steps_use_single_key_maps() {
        let yaml = descriptor_yaml(
            "https://example.com/hello-1.4.2.tar.gz",
            "  - go:\n      output: hello\n  - command:\n      program: strip\n      args: [\"{bin}/hello\"]",
        );
        let d = PackageDescriptor::from_yaml_str(&yaml).unwrap();
        assert!(matches!(&d.build_instructions[0], BuildStep::Go { go } if go.output.as_deref() == Some("hello")));
        assert!(matches!(&d.build_instructions[1], BuildStep::Command { command } if command.program == "strip"));

        let written = serde_yml::to_string(&d.build_instructions).unwrap();
        assert!(written.contains("- go:"), "{written}");
        assert!(written.contains("- command:"), "{written}");
    }

    #[test]
    fn test_empty_build_rejected() {
        let yaml = descriptor_yaml("https://example.com/hello-1.0.tar.gz", "  []")
            .replace("build:\n  []", "build: []");
        assert!(PackageDescriptor::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let yaml = descriptor_yaml(
            "ftp://example.com/hello-1.0.tar.gz",
            "  - go: {}",
        );
        assert!(PackageDescriptor::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_go_output_names_binary() {
        let yaml = descriptor_yaml(
            "https://example.com/hello-1.0.tar.gz",
            "  - go:\n      package: ./cmd/hello-cli\n      output: hello-cli",
        );
        let d = PackageDescriptor::from_yaml_str(&yaml).unwrap();
        assert_eq!(d.binary_name(), "hello-cli");
        assert_eq!(
            d.installed_path(std::path::Path::new("/opt/bin")),
            PathBuf::from("/opt/bin/hello-cli")
        );
    }

    #[test]
    fn test_output_format_default() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt, OutputFormat::Tty);
        assert_eq!("NEVER".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
    }

    proptest! {
        #[test]
        fn version_substitution_is_byte_identical(version in "[0-9][0-9A-Za-z._+~-]{0,20}") {
            let parsed = PackageVersion::new(version.clone()).unwrap();
            prop_assert_eq!(parsed.as_str(), version.as_str());

            let opts = BuildOptions::for_build(
                "hello",
                parsed.clone(),
                PathBuf::from("/src"),
                PathBuf::from("/stage"),
            );
            prop_assert_eq!(opts.expand("{version}").unwrap(), version.clone());

            let go = GoBuild {
                version_symbol: Some("main.version".into()),
                ..GoBuild::default()
            };
            prop_assert_eq!(go.ldflags_for(&parsed), format!("-X main.version={version}"));
        }

        #[test]
        fn derived_version_round_trips(version in "[0-9]{1,3}(\\.[0-9]{1,3}){0,3}") {
            let url = format!("https://example.com/archive/refs/tags/v{version}.tar.gz");
            let derived = PackageVersion::from_url(&url).unwrap();
            prop_assert_eq!(derived.as_str(), version.as_str());
        }
    }
}
