//! Migration unit discovery.
//!
//! Units live as individual files directly inside one directory. A file is a
//! unit when its name looks like `<version>_<SymbolSuffix>.<ext>`:
//!
//! ```text
//! 20190101000000_CreateResource.sql  -> version 20190101000000, symbol CreateResource
//! 20190502053908_AddResourceText.rs  -> version 20190502053908, symbol AddResourceText
//! README.md                          -> ignored
//! ```
//!
//! The version is the run of digits before the first `_`. The rest of the
//! stem, with `_` separators removed, is the symbol name the loader looks
//! up, prefixed with the configured namespace.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use schemaforge_common::Version;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{MigrationError, MigrationResult};

static UNIT_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_(\w+)\.([A-Za-z0-9]+)$").expect("valid regex"));

/// Where a unit lives and what it is expected to be called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitDescriptor {
    pub version: Version,
    pub location: PathBuf,
    pub symbol: String,
}

/// Scans one directory for migration unit files.
#[derive(Debug, Clone)]
pub struct UnitDiscovery {
    dir: PathBuf,
    namespace: String,
    extensions: Vec<String>,
    strict_versions: bool,
}

impl UnitDiscovery {
    /// Discover units in `dir`, naming symbols under `namespace`.
    ///
    /// Any extension is accepted and mixed version widths only produce a
    /// warning until configured otherwise.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, namespace: S) -> Self {
        Self {
            dir: dir.into(),
            namespace: namespace.into(),
            extensions: Vec::new(),
            strict_versions: false,
        }
    }

    /// Only recognize files with one of these extensions (case-insensitive).
    /// An empty list accepts every extension.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Treat version identifiers of differing widths as a discovery error.
    pub fn strict_versions(mut self, strict: bool) -> Self {
        self.strict_versions = strict;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// List every unit in the directory, in the order the filesystem
    /// returns them. Versions are unique across the result.
    pub fn scan(&self) -> MigrationResult<Vec<UnitDescriptor>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| MigrationError::discovery(&self.dir, e.to_string()))?;

        let mut units: Vec<UnitDescriptor> = Vec::new();
        let mut seen: HashMap<Version, PathBuf> = HashMap::new();

        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::discovery(&self.dir, e.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(parsed) = parse_unit_file_name(file_name) else {
                debug!("Ignoring non-migration file: {}", file_name);
                continue;
            };
            if !self.accepts_extension(&parsed.extension) {
                debug!("Ignoring {} (extension not accepted)", file_name);
                continue;
            }

            if let Some(previous) = seen.get(&parsed.version) {
                return Err(MigrationError::discovery(
                    &self.dir,
                    format!(
                        "version {} is used by both {} and {}",
                        parsed.version,
                        previous.display(),
                        path.display()
                    ),
                ));
            }
            seen.insert(parsed.version.clone(), path.clone());

            units.push(UnitDescriptor {
                version: parsed.version,
                symbol: symbol_name(&self.namespace, &parsed.suffix),
                location: path,
            });
        }

        self.check_version_widths(&units)?;
        debug!("Discovered {} migration unit(s) in {}", units.len(), self.dir.display());
        Ok(units)
    }

    fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.is_empty()
            || self
                .extensions
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Lexicographic order only matches chronological intent when every
    /// version has the same width.
    fn check_version_widths(&self, units: &[UnitDescriptor]) -> MigrationResult<()> {
        let widths: BTreeSet<usize> = units.iter().map(|u| u.version.width()).collect();
        if widths.len() <= 1 {
            return Ok(());
        }

        let widths = widths
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let reason = format!(
            "version identifiers have mixed widths ({widths}); string ordering may not match intended order"
        );
        if self.strict_versions {
            Err(MigrationError::discovery(&self.dir, reason))
        } else {
            warn!("{} in {}", reason, self.dir.display());
            Ok(())
        }
    }
}

/// Components of a recognized unit file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFileName {
    pub version: Version,
    /// Symbol suffix with `_` separators removed.
    pub suffix: String,
    pub extension: String,
}

/// Split `<version>_<SymbolSuffix>.<ext>`; `None` if the name doesn't match.
pub fn parse_unit_file_name(file_name: &str) -> Option<UnitFileName> {
    let captures = UNIT_FILE_NAME.captures(file_name)?;
    let suffix: String = captures[2].split('_').collect();
    if suffix.is_empty() {
        return None;
    }
    Some(UnitFileName {
        version: Version::parse(&captures[1]).ok()?,
        suffix,
        extension: captures[3].to_string(),
    })
}

/// Expected symbol for a unit: `<namespace>::<suffix>`, or just the suffix
/// when the namespace is empty.
pub fn symbol_name(namespace: &str, suffix: &str) -> String {
    let namespace = namespace.trim_end_matches("::");
    if namespace.is_empty() {
        suffix.to_string()
    } else {
        format!("{namespace}::{suffix}")
    }
}
