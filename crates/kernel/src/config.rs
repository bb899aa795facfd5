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

use ember_compiler::CompileOptions;
use ember_db::DatabaseConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STACK_DEPTH: usize = 50;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How deeply method calls may nest before `E_MAXREC` is raised.
    pub max_stack_depth: usize,
    /// Whether method source may use error codes outside the built-in set.
    pub custom_errors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            custom_errors: true,
        }
    }
}

impl RuntimeConfig {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            custom_errors: self.custom_errors,
        }
    }
}
