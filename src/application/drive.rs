use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovableDrive {
    pub path: PathBuf,
    pub label: String,
}

/// What the drive probe needs to know about one mounted disk.
#[derive(Debug, Clone)]
struct Volume {
    mount: PathBuf,
    name: String,
    removable: bool,
}

impl Volume {
    fn label(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        self.mount
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.mount.display().to_string())
    }
}

fn under_roots(mount: &Path, roots: &[PathBuf]) -> bool {
    roots.is_empty() || roots.iter().any(|root| mount.starts_with(root))
}

/// First removable volume, restricted to `roots` when any are given.
fn pick(volumes: impl IntoIterator<Item = Volume>, roots: &[PathBuf]) -> Option<RemovableDrive> {
    volumes
        .into_iter()
        .filter(|volume| volume.removable && under_roots(&volume.mount, roots))
        .min_by(|a, b| a.mount.cmp(&b.mount))
        .map(|volume| RemovableDrive {
            label: volume.label(),
            path: volume.mount,
        })
}

/// Zero or one removable drive currently mounted.
pub fn detect(roots: &[PathBuf]) -> Option<RemovableDrive> {
    let disks = Disks::new_with_refreshed_list();
    let volumes = disks.list().iter().map(|disk| Volume {
        mount: disk.mount_point().to_path_buf(),
        name: disk.name().to_string_lossy().into_owned(),
        removable: disk.is_removable(),
    });

    let drive = pick(volumes, roots);
    debug!(?drive, "drive probe");
    drive
}
