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

//! Shared setup for the permission manager integration tests.

#![allow(dead_code)]

use log::warn;
use sled_overlay::sled;

use darkfi_permission::{
    permission::{Address, PermissionId, PermissionManager, Settings},
    Result,
};

pub const MANAGER: Address = Address::new([0xd0; 20]);
pub const OWNER: Address = Address::new([0x01; 20]);
pub const TARGET: Address = Address::new([0x10; 20]);
pub const OTHER_TARGET: Address = Address::new([0x11; 20]);
pub const ALICE: Address = Address::new([0xa1; 20]);
pub const BOB: Address = Address::new([0xb0; 20]);
pub const CAROL: Address = Address::new([0xc0; 20]);
pub const ORACLE: Address = Address::new([0xe1; 20]);

pub fn admin() -> PermissionId {
    PermissionId::from_name("ADMIN_PERMISSION")
}

pub fn init_logger() {
    let mut cfg = simplelog::ConfigBuilder::new();
    cfg.add_filter_ignore("sled".to_string());

    // We check this error so we can execute same file tests in parallel,
    // otherwise second one fails to init logger here.
    if simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        //simplelog::LevelFilter::Debug,
        cfg.build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .is_err()
    {
        warn!(target: "permission::test", "Logger already initialized");
    }
}

pub struct Harness {
    pub sled_db: sled::Db,
    pub manager: PermissionManager,
}

impl Harness {
    /// Manager over a temporary database, initialized with `OWNER`.
    pub async fn new(settings: Settings) -> Result<Self> {
        init_logger();

        let sled_db = sled::Config::new().temporary(true).open()?;
        let manager = PermissionManager::new(&sled_db, MANAGER, settings)?;
        manager.init(&OWNER).await?;

        Ok(Self { sled_db, manager })
    }

    /// Give `actor` ROOT on `target`, as the owner.
    pub async fn make_root(&self, target: &Address, actor: &Address) -> Result<()> {
        let root = *darkfi_permission::permission::ROOT_PERMISSION_ID;
        self.manager.grant(&OWNER, target, actor, &root).await
    }
}
