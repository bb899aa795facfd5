// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Administration tool for ember databases. Opens the store directly, so nothing else should
//! have the database open at the same time.

use clap::Parser;
use clap_derive::{Parser as DeriveParser, Subcommand};
use ember_common::model::MethodDef;
use ember_db::open_store;
use ember_kernel::{Config, Manager};
use ember_var::{Obj, SYSTEM_OBJECT, Var};
use eyre::{WrapErr, bail, eyre};
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use mimalloc::MiMalloc;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(DeriveParser, Debug)]
#[command(name = "ember-admin")]
#[command(about = "Inspect and edit an ember database", long_about = None)]
struct Args {
    #[arg(long, value_name = "config", help = "YAML configuration file")]
    config_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "db",
        help = "Database directory; overrides the configuration file. Without one, an empty in-memory database is used"
    )]
    db: Option<PathBuf>,

    #[arg(long, help = "Enable debug logging")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List objects with their parents.
    List {
        #[arg(long, help = "Include recycled objects")]
        recycled: bool,
    },
    /// Print an object's stored record as JSON.
    Show {
        #[arg(value_parser = parse_obj)]
        object: Obj,
    },
    /// Create an object and print its id.
    Create {
        #[arg(long, value_parser = parse_obj, default_value = "#0")]
        parent: Obj,
    },
    /// Recycle an object.
    Recycle {
        #[arg(value_parser = parse_obj)]
        object: Obj,
    },
    /// Call a method. Arguments are source expressions, evaluated on the root object.
    Call {
        #[arg(value_parser = parse_obj)]
        object: Obj,
        method: String,
        args: Vec<String>,
    },
    /// Run a snippet of method source with `this` bound to the given object.
    Eval {
        #[arg(long, value_parser = parse_obj, default_value = "#0")]
        this: Obj,
        source: String,
    },
    /// Define or replace a method, reading its source from a file, or stdin when given `-`.
    SetMethod {
        #[arg(value_parser = parse_obj)]
        object: Obj,
        name: String,
        source: PathBuf,
        #[arg(long, help = "Allow players to invoke the method as a command")]
        callable: bool,
        #[arg(long = "alias", help = "A command alias; may be repeated")]
        aliases: Vec<String>,
    },
    /// Print the compiled form of a method, resolved through the object's ancestors.
    Disassemble {
        #[arg(value_parser = parse_obj)]
        object: Obj,
        method: String,
    },
    /// Point a `$name` alias at an object.
    SetAlias {
        name: String,
        #[arg(value_parser = parse_obj)]
        object: Obj,
    },
}

fn parse_obj(s: &str) -> Result<Obj, String> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    digits
        .parse::<i64>()
        .map(Obj::mk_id)
        .map_err(|_| format!("{s:?} is not an object number"))
}

fn load_config(args: &Args) -> Result<Config, eyre::Report> {
    let mut config = match &args.config_file {
        Some(config_path) => Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_path))
            .extract::<Config>()
            .map_err(|e| eyre!("Failed to parse configuration from {config_path:?}: {e}"))?,
        None => Config::default(),
    };
    if let Some(db) = &args.db {
        config.database.path = Some(db.clone());
    }
    Ok(config)
}

fn read_source(path: &PathBuf) -> Result<String, eyre::Report> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    std::fs::read_to_string(path).wrap_err_with(|| format!("reading {path:?}"))
}

fn run(manager: &Manager, command: Command) -> Result<(), eyre::Report> {
    match command {
        Command::List { recycled } => {
            for object in manager.list_all(recycled)? {
                let record = object.record();
                println!(
                    "{}\tparent {}\t{} properties, {} methods{}",
                    record.id,
                    record.parent,
                    record.properties.len(),
                    record.methods.len(),
                    if record.recycled { "\trecycled" } else { "" },
                );
            }
        }
        Command::Show { object } => {
            let object = manager.object(object)?;
            println!("{}", serde_json::to_string_pretty(&object.record())?);
        }
        Command::Create { parent } => {
            if manager.load(parent)?.is_none() {
                bail!("parent {parent} does not exist");
            }
            let object = manager.create(parent, BTreeMap::new(), BTreeMap::new())?;
            println!("{}", object.id());
        }
        Command::Recycle { object } => manager.recycle(object)?,
        Command::Call {
            object,
            method,
            args,
        } => {
            let args = if args.is_empty() {
                vec![]
            } else {
                let list = manager.eval(SYSTEM_OBJECT, &format!("return {{{}}};", args.join(", ")))?;
                list.as_list().map(|l| l.iter().cloned().collect()).unwrap_or_default()
            };
            let result: Var = manager.object(object)?.call(&method, args)?;
            println!("{result}");
        }
        Command::Eval { this, source } => {
            println!("{}", manager.eval(this, &source)?);
        }
        Command::SetMethod {
            object,
            name,
            source,
            callable,
            aliases,
        } => {
            let object = manager.object(object)?;
            let mut method = MethodDef::new(read_source(&source)?).with_aliases(aliases);
            if callable {
                method = method.callable();
            }
            object.set_method(&name, method);
            object.save()?;
            // Compile now so a broken method is reported here rather than on first use.
            manager.compiled_method(object.id(), &name)?;
            info!(object = %object.id(), %name, "method defined");
        }
        Command::Disassemble { object, method } => {
            let Some((definer, _)) = manager.object(object)?.find_method(&method)? else {
                bail!("{object} has no method {method}");
            };
            if definer != object {
                println!("-- defined on {definer}");
            }
            print!("{}", manager.compiled_method(definer, &method)?);
        }
        Command::SetAlias { name, object } => manager.set_alias(&name, object)?,
    }
    Ok(())
}

fn main() -> Result<(), eyre::Report> {
    color_eyre::install()?;
    let args = Args::parse();
    ember_common::tracing::init_tracing(args.debug)?;

    let config = load_config(&args)?;
    let store = open_store(&config.database)?;
    let manager = Manager::new(store, config.runtime.clone())?;
    manager.ensure_root()?;

    let result = run(&manager, args.command);
    if let Err(e) = manager.shutdown() {
        error!(?e, "shutdown failed");
    }
    result
}
