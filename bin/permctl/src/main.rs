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

use std::{fs, str::FromStr};

use log::{debug, info};
use serde::Deserialize;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use sled_overlay::sled;
use structopt::StructOpt;

use darkfi_permission::{
    cli_desc,
    permission::{
        frozen_permission_hash, permission_hash, Address, PermissionId, PermissionManager,
        Settings, SettingsOpt,
    },
    util::{
        cli::{get_log_config, get_log_level, spawn_config},
        path::{expand_path, get_config_path},
    },
    Error, Result,
};

/// Batch file parsing
mod batch;
use batch::{parse_batch, Batch};

const CONFIG_FILE: &str = "permctl_config.toml";
const CONFIG_FILE_CONTENTS: &str = include_str!("../permctl_config.toml");
const DEFAULT_DATABASE: &str = "~/.local/darkfi/permctl/db";

#[derive(Debug, StructOpt)]
#[structopt(name = "permctl", about = cli_desc!())]
struct Args {
    #[structopt(short, long)]
    /// Configuration file to use
    config: Option<String>,

    #[structopt(long)]
    /// Path to the permission database
    database: Option<String>,

    #[structopt(long)]
    /// Address of the permission manager
    manager: Option<Address>,

    #[structopt(long)]
    /// Address mutations are performed as
    caller: Option<Address>,

    #[structopt(flatten)]
    permission: SettingsOpt,

    #[structopt(subcommand)]
    /// Sub command to execute
    command: Subcmd,

    #[structopt(short, parse(from_occurrences))]
    /// Increase verbosity (-vvv supported)
    verbose: u8,
}

#[derive(Debug, StructOpt)]
enum Subcmd {
    /// Grant ROOT on the manager to the owner
    Init { owner: Address },

    /// Grant a permission on a target to an actor
    Grant { target: Address, actor: Address, permission: String },

    /// Grant a permission decided at check time by an oracle
    GrantWithOracle { target: Address, actor: Address, permission: String, oracle: Address },

    /// Revoke a permission on a target from an actor
    Revoke { target: Address, actor: Address, permission: String },

    /// Make a permission on a target immutable
    Freeze { target: Address, permission: String },

    /// Check whether an actor holds a permission on a target
    Check {
        target: Address,
        actor: Address,
        permission: String,

        #[structopt(long)]
        /// Hex encoded context data handed to oracles
        data: Option<String>,
    },

    /// Check whether a permission on a target is frozen
    Frozen { target: Address, permission: String },

    /// Print the raw permission record
    Get { target: Address, actor: Address, permission: String },

    /// Apply a TOML batch file atomically
    Bulk { file: String },

    /// Print the storage keys of a permission record and its freeze flag
    Hash { target: Address, actor: Address, permission: String },

    /// Print journaled permission changes
    Events {
        #[structopt(long, default_value = "0")]
        /// First sequence number to print
        from: u64,
    },
}

/// Contents of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    database: Option<String>,
    manager: Option<String>,
    caller: Option<String>,
    permission: SettingsOpt,
}

impl ConfigFile {
    fn load(path: Option<String>) -> Result<Self> {
        let explicit = path.is_some();
        let path = get_config_path(path, CONFIG_FILE)?;

        if !explicit {
            spawn_config(&path, CONFIG_FILE_CONTENTS.as_bytes())?;
        }

        debug!(target: "permctl::config", "Reading config from {:?}", path);
        let contents = fs::read_to_string(&path)?;
        Ok(toml::from_str(&contents)?)
    }
}

fn parse_optional_address(addr: Option<String>) -> Result<Option<Address>> {
    addr.map(|a| Address::from_str(&a)).transpose()
}

fn require_caller(caller: Option<Address>) -> Result<Address> {
    caller.ok_or(Error::ParseFailed("A caller address is required, see --caller"))
}

async fn realmain(args: Args, config: ConfigFile) -> Result<()> {
    // Explicit flags win over the config file
    let database = args.database.or(config.database).unwrap_or_else(|| DEFAULT_DATABASE.to_string());
    let Some(here) = args.manager.or(parse_optional_address(config.manager)?) else {
        return Err(Error::ParseFailed("A manager address is required, see --manager"))
    };
    let caller = args.caller.or(parse_optional_address(config.caller)?);
    let settings = Settings::from(args.permission.or(config.permission));

    let db_path = expand_path(&database)?;
    info!(target: "permctl", "Opening permission database at {:?}", db_path);
    let sled_db = sled::open(&db_path)?;
    let manager = PermissionManager::new(&sled_db, here, settings)?;

    match args.command {
        Subcmd::Init { owner } => {
            manager.init(&owner).await?;
            println!("Manager {} initialized, owner {}", here, owner);
        }

        Subcmd::Grant { target, actor, permission } => {
            let permission_id = PermissionId::parse(&permission)?;
            manager.grant(&require_caller(caller)?, &target, &actor, &permission_id).await?;
            println!("Granted {} on {} to {}", permission_id, target, actor);
        }

        Subcmd::GrantWithOracle { target, actor, permission, oracle } => {
            let permission_id = PermissionId::parse(&permission)?;
            let caller = require_caller(caller)?;
            manager.grant_with_oracle(&caller, &target, &actor, &permission_id, &oracle).await?;
            println!("Granted {} on {} to {} via oracle {}", permission_id, target, actor, oracle);
        }

        Subcmd::Revoke { target, actor, permission } => {
            let permission_id = PermissionId::parse(&permission)?;
            manager.revoke(&require_caller(caller)?, &target, &actor, &permission_id).await?;
            println!("Revoked {} on {} from {}", permission_id, target, actor);
        }

        Subcmd::Freeze { target, permission } => {
            let permission_id = PermissionId::parse(&permission)?;
            manager.freeze(&require_caller(caller)?, &target, &permission_id).await?;
            println!("Froze {} on {}", permission_id, target);
        }

        Subcmd::Check { target, actor, permission, data } => {
            let permission_id = PermissionId::parse(&permission)?;
            let data = match data {
                Some(d) => hex::decode(d.strip_prefix("0x").unwrap_or(&d))?,
                None => vec![],
            };
            let granted = manager.check_permission(&target, &actor, &permission_id, &data).await?;
            println!("{}", granted);
        }

        Subcmd::Frozen { target, permission } => {
            let permission_id = PermissionId::parse(&permission)?;
            println!("{}", manager.is_frozen(&target, &permission_id).await?);
        }

        Subcmd::Get { target, actor, permission } => {
            let permission_id = PermissionId::parse(&permission)?;
            println!("{}", manager.get_auth_permission(&target, &actor, &permission_id).await?);
        }

        Subcmd::Bulk { file } => {
            let batch = parse_batch(&fs::read_to_string(expand_path(&file)?)?)?;
            let caller = require_caller(caller)?;
            let len = batch.len();
            match batch {
                Batch::Single { target, permissions } => {
                    manager.bulk_on_single_target(&caller, &target, &permissions).await?
                }
                Batch::Multi(permissions) => {
                    manager.bulk_on_multi_target(&caller, &permissions).await?
                }
            }
            println!("Applied {} operations", len);
        }

        Subcmd::Hash { target, actor, permission } => {
            let permission_id = PermissionId::parse(&permission)?;
            let record = permission_hash(&target, &actor, &permission_id);
            let frozen = frozen_permission_hash(&target, &permission_id);
            println!("permission_id: {}", permission_id);
            println!("record:        0x{}", hex::encode(record));
            println!("frozen:        0x{}", hex::encode(frozen));
        }

        Subcmd::Events { from } => {
            for (seq, event) in manager.events_since(from)? {
                println!("[{}] {}", seq, event);
            }
        }
    }

    sled_db.flush_async().await?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::from_args();

    let verbosity = args.verbose as u64;
    TermLogger::init(
        get_log_level(verbosity),
        get_log_config(verbosity),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let config = ConfigFile::load(args.config.clone())?;
    smol::block_on(realmain(args, config))
}
