use std::path::{Path, PathBuf};

use crate::{cli::StoreArgs, error::Error};

const APP_DIR: &str = "ilto";

pub(crate) fn data_file<P: AsRef<Path>>(filename: P) -> Option<PathBuf> {
    #[cfg(windows)]
    {
        use known_folders::{get_known_folder_path, KnownFolder};
        let base = get_known_folder_path(KnownFolder::LocalAppData)?.join(APP_DIR);
        std::fs::create_dir_all(&base).ok()?;
        Some(base.join(filename))
    }

    #[cfg(any(unix, target_os = "redox"))]
    {
        xdg::BaseDirectories::with_prefix(APP_DIR)
            .ok()?
            .place_data_file(filename)
            .ok()
    }
}

impl StoreArgs {
    /// Returns the store path given on the command line, or the default store for
    /// the namespace's database.
    pub(crate) fn db_path(&self) -> Result<PathBuf, Error> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => data_file(format!("{}.sqlite3", self.namespace.database()))
                .ok_or(Error::NoDataDirectory),
        }
    }
}
