//! Saving functions to disk and loading them back by variable name.
//!
//! A dump of `base` consists of two files:
//!
//! - `base.dddmp`, the DDDMP structure of the function (see [`crate::dddmp`]);
//! - `base.json`, a JSON object mapping every variable name of the manager
//!   to its level at dump time.
//!
//! Loading registers the variables the manager does not know yet, brings
//! the named variables into the recorded relative order and rebuilds the
//! function by name.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::dddmp::DumpFile;
use crate::error::{Error, Result};
use crate::function::Function;
use crate::manager::Manager;

/// Name → level map stored next to each dump.
pub type LevelMap = BTreeMap<String, u32>;

pub const DUMP_EXTENSION: &str = ".dddmp";
pub const LEVELS_EXTENSION: &str = ".json";

fn with_extension(base: &Path, extension: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(extension);
    path.into()
}

/// Paths of the structure file and the level file for `base`.
pub fn dump_paths(base: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    let base = base.as_ref();
    (with_extension(base, DUMP_EXTENSION), with_extension(base, LEVELS_EXTENSION))
}

impl Manager {
    /// Writes `u` to `base.dddmp` and the variable levels to `base.json`.
    pub fn dump(&self, u: &Function, base: impl AsRef<Path>) -> Result<()> {
        self.check_owner(u)?;
        let (dump_path, levels_path) = dump_paths(base);

        let dump = self.bdd().to_dump(u.node(), self.registry().names_by_index())?;
        let levels = self.levels();

        let mut writer = BufWriter::new(File::create(&levels_path)?);
        serde_json::to_writer_pretty(&mut writer, &levels).map_err(std::io::Error::from)?;
        writeln!(writer)?;
        writer.flush()?;

        let mut writer = BufWriter::new(File::create(&dump_path)?);
        dump.write(&mut writer)?;
        writer.flush()?;

        info!(
            "Dumped {} nodes over {} variables to {}",
            dump.num_nodes(),
            levels.len(),
            dump_path.display()
        );
        Ok(())
    }

    /// Loads a function written by [`dump`](Self::dump).
    ///
    /// Both files are read and checked before the manager is touched: on
    /// [`Error::LoadFailure`] no variable has been registered. Reordering
    /// is set to `enable_reordering` while the function is rebuilt and
    /// restored afterwards.
    pub fn load(&self, base: impl AsRef<Path>, enable_reordering: bool) -> Result<Function> {
        let (dump_path, levels_path) = dump_paths(base);
        let levels = read_levels(&levels_path)?;
        let dump = read_dump(&dump_path)?;

        for name in &dump.supp_var_names {
            if !levels.contains_key(name) {
                return Err(Error::load(
                    &levels_path,
                    format!("support variable `{}` has no recorded level", name),
                ));
            }
        }

        let mut by_level: Vec<(u32, &str)> = levels.iter().map(|(name, &level)| (level, name.as_str())).collect();
        by_level.sort_unstable();
        let missing: Vec<&str> = by_level
            .iter()
            .map(|&(_, name)| name)
            .filter(|name| !self.contains(name))
            .collect();
        for name in &missing {
            self.add_var(name, None)?;
        }
        if !missing.is_empty() {
            debug!("Registered {} new variables: {:?}", missing.len(), missing);
        }

        self.reorder_to(&levels)?;

        let reordering = self.reordering();
        self.set_reordering(enable_reordering);
        let loaded = {
            let registry = self.registry();
            self.bdd().load_by_names(&dump, |name| registry.var(name))
        };
        let res = loaded.map(|node| self.wrap(node));
        self.set_reordering(reordering);

        let res = res.map_err(|reason| Error::load(&dump_path, reason))?;
        info!("Loaded {} nodes from {}", dump.num_nodes(), dump_path.display());
        Ok(res)
    }
}

fn read_levels(path: &Path) -> Result<LevelMap> {
    let file = File::open(path).map_err(|e| Error::load(path, e))?;
    let levels: LevelMap = serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::load(path, e))?;

    let mut seen = HashSet::new();
    for (name, &level) in &levels {
        if !seen.insert(level) {
            return Err(Error::load(path, format!("level {} is recorded twice (again for `{}`)", level, name)));
        }
    }
    Ok(levels)
}

fn read_dump(path: &Path) -> Result<DumpFile> {
    let file = File::open(path).map_err(|e| Error::load(path, e))?;
    DumpFile::parse(BufReader::new(file)).map_err(|e| Error::load(path, e))
}
