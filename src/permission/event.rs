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

use std::fmt;

use darkfi_serial::{SerialDecodable, SerialEncodable};

use super::{Address, PermissionId, PermissionValue};

/// Change notification, published once per effective state change.
#[derive(Copy, Clone, Debug, Eq, PartialEq, SerialEncodable, SerialDecodable)]
pub enum PermissionEvent {
    Granted {
        permission_id: PermissionId,
        caller: Address,
        target: Address,
        actor: Address,
        value: PermissionValue,
    },
    Revoked {
        permission_id: PermissionId,
        caller: Address,
        target: Address,
        actor: Address,
    },
    Frozen {
        target: Address,
        permission_id: PermissionId,
    },
}

impl fmt::Display for PermissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Granted { permission_id, caller, target, actor, value } => write!(
                f,
                "Granted permission={} caller={} target={} actor={} value={}",
                permission_id, caller, target, actor, value
            ),
            Self::Revoked { permission_id, caller, target, actor } => write!(
                f,
                "Revoked permission={} caller={} target={} actor={}",
                permission_id, caller, target, actor
            ),
            Self::Frozen { target, permission_id } => {
                write!(f, "Frozen permission={} target={}", permission_id, target)
            }
        }
    }
}
