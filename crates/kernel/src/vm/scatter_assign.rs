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

use ember_compiler::{Label, Name, ScatterArgs, ScatterLabel};
use ember_var::{E_ARGS, Error, Var, v_list};

/// Distribute `values` over the targets of a scatter assignment, calling `set_var` for each
/// target that receives a value. Required targets are filled first, optional targets take what
/// is left over left to right, and a rest target collects the remainder.
///
/// Returns the label of the default-value code for the first optional target left unfilled, if
/// there is one; execution continues there rather than at the table's `done` label.
pub(crate) fn scatter_assign<F>(
    table: &ScatterArgs,
    values: &[Var],
    mut set_var: F,
) -> Result<Option<Label>, Error>
where
    F: FnMut(&Name, Var),
{
    let nargs = table.labels.len();
    let nreq = table.nreq();
    let have_rest = table.has_rest();
    let len = values.len();

    if len < nreq || (!have_rest && len > nargs) {
        return Err(E_ARGS.with_msg(|| {
            format!("scatter expected {nreq} to {nargs} values, got {len}")
        }));
    }

    let mut nopt_avail = len - nreq;
    let nrest = if have_rest && len >= nargs {
        len - nargs + 1
    } else {
        0
    };

    let mut jump_where = None;
    let mut values_iter = values.iter();
    for label in &table.labels {
        match label {
            ScatterLabel::Rest(id) => {
                let rest: Vec<Var> = values_iter.by_ref().take(nrest).cloned().collect();
                set_var(id, v_list(&rest));
            }
            ScatterLabel::Required(id) => {
                let Some(value) = values_iter.next() else {
                    return Err(E_ARGS.into());
                };
                set_var(id, value.clone());
            }
            ScatterLabel::Optional(id, default) => {
                if nopt_avail > 0 {
                    nopt_avail -= 1;
                    let Some(value) = values_iter.next() else {
                        return Err(E_ARGS.into());
                    };
                    set_var(id, value.clone());
                } else if jump_where.is_none() && default.is_some() {
                    jump_where = *default;
                }
            }
        }
    }
    Ok(jump_where)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_var::{v_int, v_str};
    use std::collections::HashMap;

    fn table(labels: Vec<ScatterLabel>) -> ScatterArgs {
        ScatterArgs {
            labels,
            done: Label(0),
        }
    }

    fn run(
        table: &ScatterArgs,
        values: &[Var],
    ) -> (Result<Option<Label>, Error>, HashMap<Name, Var>) {
        let mut assigned = HashMap::new();
        let result = scatter_assign(table, values, |name, value| {
            assigned.insert(*name, value);
        });
        (result, assigned)
    }

    #[test]
    fn test_required_targets() {
        let t = table(vec![
            ScatterLabel::Required(Name(6)),
            ScatterLabel::Required(Name(7)),
        ]);
        let (result, assigned) = run(&t, &[v_int(42), v_str("hello")]);
        assert_eq!(result, Ok(None));
        assert_eq!(assigned.get(&Name(6)), Some(&v_int(42)));
        assert_eq!(assigned.get(&Name(7)), Some(&v_str("hello")));
    }

    #[test]
    fn test_unfilled_optional_jumps_to_its_default() {
        let t = table(vec![
            ScatterLabel::Required(Name(6)),
            ScatterLabel::Optional(Name(7), Some(Label(3))),
        ]);
        let (result, assigned) = run(&t, &[v_str("Alice")]);
        assert_eq!(result, Ok(Some(Label(3))));
        assert!(!assigned.contains_key(&Name(7)));
    }

    #[test]
    fn test_rest_collects_the_remainder() {
        let t = table(vec![
            ScatterLabel::Required(Name(6)),
            ScatterLabel::Optional(Name(7), None),
            ScatterLabel::Rest(Name(8)),
        ]);
        let (result, assigned) = run(&t, &[v_int(1), v_int(2), v_int(3), v_int(4)]);
        assert_eq!(result, Ok(None));
        assert_eq!(assigned.get(&Name(7)), Some(&v_int(2)));
        assert_eq!(assigned.get(&Name(8)), Some(&v_list(&[v_int(3), v_int(4)])));

        let (_, assigned) = run(&t, &[v_int(1)]);
        assert_eq!(assigned.get(&Name(8)), Some(&v_list(&[])));
    }

    #[test]
    fn test_count_mismatch_is_args_error() {
        let t = table(vec![ScatterLabel::Required(Name(6))]);
        let (result, _) = run(&t, &[v_int(1), v_int(2)]);
        assert_eq!(result.unwrap_err().err_type, E_ARGS);
        let (result, _) = run(&t, &[]);
        assert_eq!(result.unwrap_err().err_type, E_ARGS);
    }
}
