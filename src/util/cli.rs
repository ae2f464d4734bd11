/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{fs, io::Write, path::Path};

use log::info;
use simplelog::{ConfigBuilder, LevelFilter};

use crate::Result;

/// Map `-v` occurrences to a log level.
pub fn get_log_level(verbosity_level: u64) -> LevelFilter {
    match verbosity_level {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Build the logger config. Below trace verbosity, the `sled` internals
/// are filtered out. `LOG_TARGETS` holds a comma separated list of
/// targets to show, or to hide when prefixed with `!`.
pub fn get_log_config(verbosity_level: u64) -> simplelog::Config {
    let mut cfg = ConfigBuilder::new();

    if verbosity_level < 2 {
        cfg.add_filter_ignore_str("sled");
    }

    if let Ok(targets) = std::env::var("LOG_TARGETS") {
        for target in targets.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match target.strip_prefix('!') {
                Some(ignored) => cfg.add_filter_ignore(ignored.to_string()),
                None => cfg.add_filter_allow(target.to_string()),
            };
        }
    }

    cfg.build()
}

/// Write `contents` to `path` if nothing exists there yet, creating the
/// parent directories.
pub fn spawn_config(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        return Ok(())
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    info!(target: "util::cli::spawn_config", "Config file created in {:?}", path);

    Ok(())
}
