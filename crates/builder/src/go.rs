//! `go build` invocation

use crate::execution::CommandSpec;
use spkg_errors::Error;
use spkg_types::{BuildOptions, GoBuild};
use std::collections::BTreeMap;
use std::path::Path;

/// Assemble the `go build` command for a structured go step
///
/// Produces `build [-trimpath] [-p N] -o {bin}/<output> [-ldflags=...] [-tags=...] <package>`.
/// The version reaches the binary only through the `-X` flag built by
/// [`GoBuild::ldflags_for`].
///
/// # Errors
///
/// Returns a descriptor error if an environment value uses an unknown
/// placeholder.
pub fn go_build_command(
    go: &GoBuild,
    opts: &BuildOptions,
    go_binary: &str,
    jobs: Option<usize>,
    source_root: &Path,
) -> Result<CommandSpec, Error> {
    let mut args = vec!["build".to_string()];

    if go.trimpath {
        args.push("-trimpath".to_string());
    }

    if let Some(jobs) = jobs {
        args.push(format!("-p={jobs}"));
    }

    args.push("-o".to_string());
    args.push(
        opts.bin_dir
            .join(go.output_name(&opts.name))
            .display()
            .to_string(),
    );

    let ldflags = go.ldflags_for(&opts.version);
    if !ldflags.is_empty() {
        args.push(format!("-ldflags={ldflags}"));
    }

    if !go.tags.is_empty() {
        args.push(format!("-tags={}", go.tags.join(",")));
    }

    args.push(go.package.clone());

    let mut env = BTreeMap::new();
    for (key, value) in &go.env {
        env.insert(key.clone(), opts.expand(value)?);
    }

    Ok(CommandSpec::new(go_binary)
        .args(args)
        .envs(env)
        .current_dir(source_root))
}
