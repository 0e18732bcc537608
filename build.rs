//! Build-time version stamping only.
//!
//! The teacher's `build.rs` also bundled a web frontend (`npm install` / `npm
//! run build` into `web/build`, consumed by `include_dir!`) and musl/libpq
//! static-linking configuration. Neither applies here: there is no embedded
//! frontend (the dashboard is an out-of-scope external consumer of the REST
//! surface, §1) and no diesel/libpq dependency (dropped dependencies,
//! DESIGN.md). Only the git-derived version stamping survives the transform.

fn main() {
    generate_version_info();
}

/// Generate version information from git tags using vergen.
///
/// Ported from the teacher's `build.rs`. The version is derived from `git
/// describe --tags --always --dirty`:
/// - For tagged commits: the tag name (e.g., "v0.1.4")
/// - For commits after a tag: tag + commits + hash (e.g., "v0.1.4-2-ge930185")
/// - For dirty working trees: appends "-dirty"
/// - For non-git environments: falls back to a default
fn generate_version_info() {
    use vergen_git2::{BuildBuilder, CargoBuilder, Emitter, Git2Builder};

    let build = BuildBuilder::default()
        .build_timestamp(true)
        .build()
        .expect("Failed to configure build info");

    let cargo = CargoBuilder::default()
        .target_triple(true)
        .build()
        .expect("Failed to configure cargo info");

    let git2 = Git2Builder::default()
        .describe(true, true, None)
        .sha(true)
        .build()
        .expect("Failed to configure git info");

    Emitter::default()
        .add_instructions(&build)
        .expect("Failed to add build instructions")
        .add_instructions(&cargo)
        .expect("Failed to add cargo instructions")
        .add_instructions(&git2)
        .expect("Failed to add git instructions")
        .emit()
        .expect("Failed to emit version info");
}
