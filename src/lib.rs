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

pub mod error;
pub use error::{Error, Result};

/// Permission records, evaluation and mutation
pub mod permission;

/// Async primitives shared across the crate
pub mod system;

/// Various helper utilities
pub mod util;

/// Builds the `about` string for binaries from their Cargo metadata.
#[macro_export]
macro_rules! cli_desc {
    () => {{
        let commitish = match option_env!("COMMITISH") {
            Some(c) => format!("-{}", c),
            None => String::new(),
        };

        let desc = Box::leak(
            format!(
                "{} {}{}\n{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                commitish,
                env!("CARGO_PKG_DESCRIPTION"),
            )
            .into_boxed_str(),
        );

        desc as &str
    }};
}
