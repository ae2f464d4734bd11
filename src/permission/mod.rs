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

//! Permission manager: who may act on what.
//!
//! A permission record binds an actor to a permission identifier on a
//! target. Records are either unset, unconditional (`ALLOW`), or defer
//! to an oracle deciding at check time. `ANY_ADDR` on either side of a
//! record matches every actor or every target.

/// Identifiers, flags and bulk operation types
pub mod model;
pub use model::{
    Address, MultiTargetPermission, PermissionId, PermissionOperation, PermissionValue,
    SingleTargetPermission, ADDRESS_LEN, ALLOW_FLAG, ANY_ADDR, ROOT_PERMISSION_ID, UNSET_FLAG,
};

/// Deterministic storage keys
pub mod hash;
pub use hash::{frozen_permission_hash, permission_hash};

/// Change notifications
pub mod event;
pub use event::PermissionEvent;

/// Sled-backed record storage
pub mod store;
pub use store::{PermissionReader, PermissionStore, PermissionStoreOverlay};

/// Runtime oracles
pub mod oracle;
pub use oracle::{
    AllowOracle, ContextOracle, DenyOracle, IdGatingOracle, OracleRegistry, PermissionOracle,
    PermissionOraclePtr, ToggleOracle,
};

/// Grant evaluation with wildcard fallback
pub mod evaluator;
pub use evaluator::AuthorizationEvaluator;

/// Manager settings
pub mod settings;
pub use settings::{DuplicatePolicy, Settings, SettingsOpt};

/// Authorized, atomic mutations
pub mod manager;
pub use manager::PermissionManager;
