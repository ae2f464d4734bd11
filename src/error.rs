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

// Hello developer. Please add your error to the according subsection
// that is commented, or make a new subsection. Keep it clean.

use sled_overlay::sled;

use crate::permission::{Address, PermissionId, PermissionValue};

/// Main result type used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// General library errors used throughout the codebase.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // =================
    // Permission errors
    // =================
    #[error("Unauthorized: {actor} lacks {permission_id} on {target} (manager {here})")]
    Unauthorized { here: Address, target: Address, actor: Address, permission_id: PermissionId },

    #[error("Permission {permission_id} on {target} is frozen")]
    AlreadyFrozen { target: Address, permission_id: PermissionId },

    #[error("Permission {permission_id} on {target} is already granted to {actor}")]
    PermissionAlreadyGranted { target: Address, actor: Address, permission_id: PermissionId },

    #[error("Permission {permission_id} on {target} is already revoked from {actor}")]
    PermissionAlreadyRevoked { target: Address, actor: Address, permission_id: PermissionId },

    #[error(
        "Permission {permission_id} on {target} for {actor} is set to {current}, refusing to replace it with {requested}"
    )]
    AlreadyGrantedDifferentOracle {
        target: Address,
        actor: Address,
        permission_id: PermissionId,
        current: PermissionValue,
        requested: PermissionValue,
    },

    #[error("ANY_ADDR is disallowed for both target and actor")]
    WildcardBothSides,

    #[error("Permission {permission_id} can not be granted with ANY_ADDR (target {target}, actor {actor})")]
    WildcardRestricted { target: Address, actor: Address, permission_id: PermissionId },

    #[error("Granting {permission_id} with ANY_ADDR requires an oracle (target {target}, actor {actor})")]
    OracleRequiredForWildcard { target: Address, actor: Address, permission_id: PermissionId },

    #[error("Freezing on ANY_ADDR is disallowed")]
    WildcardTargetDisallowed,

    #[error("Invalid oracle address: {0}")]
    InvalidOracle(Address),

    #[error("Permission manager is already initialized")]
    AlreadyInitialized,

    #[error("Flag address {0} can not host a permission manager")]
    InvalidManagerAddress(Address),

    // =============
    // Oracle errors
    // =============
    #[error("No oracle registered at {0}")]
    OracleNotRegistered(Address),

    #[error("Oracle {0} timed out")]
    OracleTimeout(Address),

    #[error("Oracle failed: {0}")]
    OracleFailed(String),

    // ==============
    // Parsing errors
    // ==============
    #[error("Parse failed: {0}")]
    ParseFailed(&'static str),

    #[error(transparent)]
    HexDecodeError(#[from] hex::FromHexError),

    #[error(transparent)]
    TomlDeserializeError(#[from] toml::de::Error),

    // ===============
    // Database errors
    // ===============
    #[error(transparent)]
    SledError(#[from] sled::Error),

    #[error("sled transaction failed: {0}")]
    SledTransactionError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // =============
    // System errors
    // =============
    #[error("Publisher was destroyed")]
    PublisherDestroyed,

    // =============
    // Misc errors
    // =============
    #[error("Could not find the home directory")]
    HomeDirNotFound,

    #[error("IO error: {0:?}")]
    Io(std::io::ErrorKind),

    #[error("Failed to initialize logger: {0}")]
    SetLoggerError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<sled::transaction::TransactionError<sled::Error>> for Error {
    fn from(err: sled::transaction::TransactionError<sled::Error>) -> Self {
        Self::SledTransactionError(err.to_string())
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Self::SetLoggerError(err.to_string())
    }
}
