//! Integration tests for the builder crate

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use spkg_builder::*;
    use spkg_errors::{BuildError, Error};
    use spkg_events::{channel, AppEvent, BuildEvent};
    use spkg_types::PackageDescriptor;
    use std::fs::File;
    use std::path::Path;

    const SCRIPT: &[u8] = b"#!/bin/sh\necho \"hello $HELLO_VERSION\"\n";

    fn write_source_archive(path: &Path) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(SCRIPT.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "hello-1.4.2/hello.sh", SCRIPT)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn descriptor(build_args: &str) -> PackageDescriptor {
        let yaml = format!(
            r#"
metadata:
  name: hello
  description: greeting tool
  homepage: https://example.com/hello
  license: MIT
source:
  url: https://example.com/hello-1.4.2.tar.gz
  sha256: ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
dependencies:
  build: [sh]
build:
  - command:
      program: sh
      args: ["-c", {build_args}]
test:
  command: ["{{bin}}/hello"]
  expect: hello
"#
        );
        PackageDescriptor::from_yaml_str(&yaml).unwrap()
    }

    #[tokio::test]
    async fn test_extract_and_build_embeds_version() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("hello-1.4.2.tar.gz");
        write_source_archive(&archive);

        let root = extract(&archive, &temp.path().join("src")).await.unwrap();
        assert!(root.ends_with("hello-1.4.2"));

        let d = descriptor(
            r#""sed 's/$HELLO_VERSION/{version}/' hello.sh > {bin}/{name} && chmod +x {bin}/{name}""#,
        );
        let (tx, mut rx) = channel();
        let builder = SourceBuilder::new(BuildConfig::default()).with_event_sender(tx);
        let staging = temp.path().join("stage");

        let artifact = builder.build(&d, &root, &staging).await.unwrap();
        assert_eq!(artifact.path, staging.join("bin").join("hello"));

        let output = run_checked(&CommandSpec::new(artifact.path.display().to_string()))
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello 1.4.2\n");

        let mut saw_steps = 0;
        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Build(BuildEvent::StepStarted { .. }) => saw_steps += 1,
                AppEvent::Build(BuildEvent::Completed { .. }) => saw_complete = true,
                _ => {}
            }
        }
        assert_eq!(saw_steps, 1);
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn test_failing_step_reports_tool_output() {
        let temp = tempfile::tempdir().unwrap();
        let d = descriptor(r#""echo 'hello.go:3: undefined: x' >&2; exit 2""#);
        let builder = SourceBuilder::new(BuildConfig::default());

        let err = builder
            .build(&d, temp.path(), &temp.path().join("stage"))
            .await
            .unwrap_err();
        match err {
            Error::Build(BuildError::CommandFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(2));
                assert_eq!(stderr, "hello.go:3: undefined: x\n");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let temp = tempfile::tempdir().unwrap();
        let d = descriptor(r#""true""#);
        let builder = SourceBuilder::new(BuildConfig::default());

        let err = builder
            .build(&d, temp.path(), &temp.path().join("stage"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn test_plan_expands_placeholders() {
        let d = descriptor(r#""cp {source}/hello.sh {bin}/{name}-{version}""#);
        let builder = SourceBuilder::new(BuildConfig::default());
        let opts = spkg_types::BuildOptions::for_build(
            "hello",
            d.version.clone(),
            "/w/src".into(),
            "/w/stage".into(),
        );

        let plan = builder.plan(&d, &opts, Path::new("/w/src")).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].args,
            vec!["-c", "cp /w/src/hello.sh /w/stage/bin/hello-1.4.2"]
        );
    }
}
