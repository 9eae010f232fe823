//! Flamegraph rendering of per-job profiles
//!
//! Every stats directory gets a `profile-index.html` listing the frontend
//! jobs' profiles by type. Each profile is piped through `flamegraph.pl`
//! into `<profile>.svg` next to it when the script is available.

use crate::jobstats::JobProfiles;
use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const FLAMEGRAPH_SCRIPT: &str = "flamegraph.pl";
pub const PROFILE_INDEX: &str = "profile-index.html";

/// Result of rendering one stats directory
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedProfiles {
    pub index: PathBuf,
    pub rendered: usize,
}

/// The explicit script, else `flamegraph.pl` on `PATH`
pub fn find_flamegraph_script(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(FLAMEGRAPH_SCRIPT))
        .find(|candidate| candidate.is_file())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_flamegraph(
    script: &Path,
    profile: &Path,
    svg: &Path,
    title: &str,
    subtitle: &str,
) -> Result<()> {
    tracing::info!("Building flamegraph {}", svg.display());
    let input =
        File::open(profile).with_context(|| format!("Failed to open {}", profile.display()))?;
    let output = File::create(svg).with_context(|| format!("Failed to create {}", svg.display()))?;

    let status = Command::new(script)
        .arg("--title")
        .arg(title)
        .arg("--subtitle")
        .arg(subtitle)
        .stdin(Stdio::from(input))
        .stdout(Stdio::from(output))
        .status()
        .with_context(|| format!("Failed to run {}", script.display()))?;

    if !status.success() {
        bail!("{} failed on {} ({})", script.display(), profile.display(), status);
    }
    Ok(())
}

/// Write the profile index for `stats_dir`, rendering SVGs when `script` is set
pub fn render_profiles(
    stats_dir: &Path,
    jobs: &[JobProfiles],
    script: Option<&Path>,
) -> Result<RenderedProfiles> {
    let profile_types: BTreeSet<&str> = jobs
        .iter()
        .flat_map(|job| job.profiles.keys().map(String::as_str))
        .collect();

    let mut html = String::new();
    let mut rendered = 0;

    for profile_type in profile_types {
        writeln!(html, "<h2>Profile type: {}</h2>", escape_html(profile_type))?;
        writeln!(html, "<ul>")?;
        for job in jobs.iter().filter(|job| job.is_frontend_job()) {
            writeln!(
                html,
                "    <li>Module {} :: {}",
                escape_html(&job.module),
                escape_html(&job.job_args.join(" "))
            )?;
            writeln!(html, "    <ul>")?;

            for (counter, path) in job.profiles.get(profile_type).into_iter().flatten() {
                let path = fs::canonicalize(path)
                    .with_context(|| format!("Failed to resolve {}", path.display()))?;
                let target = match script {
                    Some(script) => {
                        let mut svg = path.clone().into_os_string();
                        svg.push(".svg");
                        let svg = PathBuf::from(svg);
                        let title = format!(
                            "Module: {}, File: {}, Counter: {}, Profile: {}",
                            job.module,
                            job.input(),
                            counter,
                            profile_type
                        );
                        let subtitle = format!("{}, -{}", job.triple(), job.opt());
                        render_flamegraph(script, &path, &svg, &title, &subtitle)?;
                        rendered += 1;
                        svg
                    }
                    None => path,
                };
                writeln!(
                    html,
                    "        <li><tt><a href=\"file://{}\">{}</a></tt>",
                    escape_html(&target.display().to_string()),
                    escape_html(counter)
                )?;
            }

            writeln!(html, "    </ul>")?;
            writeln!(html, "    </li>")?;
        }
        writeln!(html, "</ul>")?;
    }

    let index = stats_dir.join(PROFILE_INDEX);
    fs::write(&index, html).with_context(|| format!("Failed to write {}", index.display()))?;
    Ok(RenderedProfiles { index, rendered })
}
