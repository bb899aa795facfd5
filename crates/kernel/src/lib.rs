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

//! The object runtime: a cache of resident objects over a durable store, resolution of
//! properties and methods through prototype chains, and a virtual machine for method source.

pub use crate::config::{Config, RuntimeConfig};
pub use crate::errors::{Exception, ExecutionFailure, RuntimeError, TraceFrame};
pub use crate::manager::{LoadOptions, Manager};
pub use crate::object::{CommandContext, ObjectHandle};
pub use crate::view::{BoundMethod, ObjectView, RESERVED_KEYS, ViewValue};

pub mod config;
mod errors;
mod manager;
mod object;
mod view;
mod vm;
mod writer;
