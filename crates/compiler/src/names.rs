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

use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Variables bound in every activation before the method body runs. Their offsets in the
/// environment are fixed: the first `GlobalName::COUNT` slots, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum GlobalName {
    This,
    Player,
    Caller,
    Verb,
    Args,
    Argstr,
}

/// A Name is a unique identifier for a variable in the program's environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(pub u16);

impl From<GlobalName> for Name {
    fn from(global: GlobalName) -> Self {
        Name(global as u16)
    }
}

/// The variable table for one program. Variable names are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Names {
    names: Vec<String>,
}

impl Default for Names {
    fn default() -> Self {
        Self::new()
    }
}

impl Names {
    pub fn new() -> Self {
        let mut names = Self { names: vec![] };
        for global in GlobalName::iter() {
            names.find_or_add_name(global.to_string().as_str());
        }
        names
    }

    /// Add a name to the name table, if it doesn't already exist.
    /// If it does exist, return the existing name.
    pub fn find_or_add_name(&mut self, name: &str) -> Name {
        let name = name.to_lowercase();
        match self.names.iter().position(|n| *n == name) {
            None => {
                let pos = self.names.len();
                self.names.push(name);
                Name(pos as u16)
            }
            Some(n) => Name(n as u16),
        }
    }

    pub fn find_name(&self, name: &str) -> Option<Name> {
        let name = name.to_lowercase();
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|x| Name(x as u16))
    }

    /// Return the width of the name table, to be used as the (total) environment size.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn name_of(&self, name: &Name) -> Option<&str> {
        self.names.get(name.0 as usize).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_global(&self, name: &Name) -> bool {
        (name.0 as usize) < GlobalName::COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_are_prebound() {
        let names = Names::new();
        assert_eq!(names.width(), GlobalName::COUNT);
        assert_eq!(names.find_name("this"), Some(Name::from(GlobalName::This)));
        assert_eq!(names.find_name("argstr"), Some(Name::from(GlobalName::Argstr)));
        assert!(names.is_global(&Name::from(GlobalName::Args)));
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut names = Names::new();
        let hp = names.find_or_add_name("HP");
        assert_eq!(names.find_or_add_name("hp"), hp);
        assert_eq!(names.name_of(&hp), Some("hp"));
        assert!(!names.is_global(&hp));
    }
}
