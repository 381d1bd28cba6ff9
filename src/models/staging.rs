use crate::error::{Result, StageError};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// The directory both procedures write model assets into
#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory and its parents if missing
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Join a manifest-relative path onto the directory.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let mut clean = PathBuf::new();

        for component in rel.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StageError::UnsafePath(rel.to_path_buf()));
                }
            }
        }

        if clean.as_os_str().is_empty() {
            return Err(StageError::UnsafePath(rel.to_path_buf()));
        }

        Ok(self.root.join(clean))
    }

    /// Entry names directly inside the directory, sorted.
    ///
    /// Subdirectories carry a trailing `/`.
    pub fn list_entries(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(&self.root)?
            .flatten()
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    format!("{name}/")
                } else {
                    name
                }
            })
            .collect();

        names.sort();
        Ok(names)
    }

    /// Print the directory contents as the closing report of a procedure
    pub fn print_contents(&self) -> Result<()> {
        println!("\n📁 Model files saved in: {}", self.root.display());
        println!("\nFiles created:");
        for name in self.list_entries()? {
            println!("  - {name}");
        }
        Ok(())
    }
}
