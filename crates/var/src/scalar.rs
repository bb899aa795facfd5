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

use crate::variant::Variant;
use crate::{E_DIV, E_FLOAT, E_INVARG, E_TYPE, Error, Var, v_float, v_int, v_string};
use paste::paste;
use std::cmp::Ordering;
use std::ops::{Mul, Neg, Sub};

fn checked_float(f: f64) -> Result<Var, Error> {
    if f.is_finite() {
        Ok(v_float(f))
    } else {
        Err(E_FLOAT.into())
    }
}

macro_rules! binary_numeric_coercion_op {
    ($op:tt) => {
        pub fn $op(&self, v: &Var) -> Result<Var, Error> {
            match (self.variant(), v.variant()) {
                (Variant::Float(l), Variant::Float(r)) => checked_float(l.$op(*r)),
                (Variant::Int(l), Variant::Int(r)) => {
                    paste! { l.[<checked_ $op>](*r).map(v_int).ok_or(E_INVARG.into()) }
                }
                (Variant::Float(l), Variant::Int(r)) => checked_float(l.$op(*r as f64)),
                (Variant::Int(l), Variant::Float(r)) => checked_float((*l as f64).$op(*r)),
                (_, _) => Err(E_TYPE.into()),
            }
        }
    };
}

impl Var {
    binary_numeric_coercion_op!(mul);
    binary_numeric_coercion_op!(sub);

    pub fn add(&self, v: &Var) -> Result<Var, Error> {
        match (self.variant(), v.variant()) {
            (Variant::Float(l), Variant::Float(r)) => checked_float(l + r),
            (Variant::Int(l), Variant::Int(r)) => {
                l.checked_add(*r).map(v_int).ok_or(E_INVARG.into())
            }
            (Variant::Float(l), Variant::Int(r)) => checked_float(l + (*r as f64)),
            (Variant::Int(l), Variant::Float(r)) => checked_float(*l as f64 + r),
            (Variant::Str(l), Variant::Str(r)) => Ok(v_string(format!("{l}{r}"))),
            (Variant::List(l), Variant::List(r)) => {
                let mut joined = l.clone();
                joined.append(r.clone());
                Ok(Var::from_variant(Variant::List(joined)))
            }
            (_, _) => Err(E_TYPE.into()),
        }
    }

    pub fn div(&self, v: &Var) -> Result<Var, Error> {
        match (self.variant(), v.variant()) {
            (_, Variant::Int(0)) => Err(E_DIV.into()),
            (_, Variant::Float(r)) if *r == 0.0 => Err(E_DIV.into()),
            (Variant::Float(l), Variant::Float(r)) => checked_float(l / r),
            (Variant::Int(l), Variant::Int(r)) => {
                l.checked_div(*r).map(v_int).ok_or(E_INVARG.into())
            }
            (Variant::Float(l), Variant::Int(r)) => checked_float(l / (*r as f64)),
            (Variant::Int(l), Variant::Float(r)) => checked_float(*l as f64 / r),
            (_, _) => Err(E_TYPE.into()),
        }
    }

    pub fn modulus(&self, v: &Var) -> Result<Var, Error> {
        match (self.variant(), v.variant()) {
            (_, Variant::Int(0)) => Err(E_DIV.into()),
            (_, Variant::Float(r)) if *r == 0.0 => Err(E_DIV.into()),
            (Variant::Float(l), Variant::Float(r)) => checked_float(l % r),
            (Variant::Int(l), Variant::Int(r)) => {
                l.checked_rem(*r).map(v_int).ok_or(E_INVARG.into())
            }
            (Variant::Float(l), Variant::Int(r)) => checked_float(l % (*r as f64)),
            (Variant::Int(l), Variant::Float(r)) => checked_float(*l as f64 % r),
            (_, _) => Err(E_TYPE.into()),
        }
    }

    pub fn pow(&self, v: &Var) -> Result<Var, Error> {
        match (self.variant(), v.variant()) {
            (Variant::Float(l), Variant::Float(r)) => checked_float(l.powf(*r)),
            (Variant::Int(l), Variant::Int(r)) => {
                let r = u32::try_from(*r).map_err(|_| E_INVARG)?;
                l.checked_pow(r).map(v_int).ok_or(E_INVARG.into())
            }
            (Variant::Float(l), Variant::Int(r)) => checked_float(l.powi(*r as i32)),
            (Variant::Int(l), Variant::Float(r)) => checked_float((*l as f64).powf(*r)),
            (_, _) => Err(E_TYPE.into()),
        }
    }

    pub fn negative(&self) -> Result<Var, Error> {
        match self.variant() {
            Variant::Int(l) => l.checked_neg().map(v_int).ok_or(E_INVARG.into()),
            Variant::Float(f) => Ok(v_float(f.neg())),
            _ => Err(E_TYPE.into()),
        }
    }

    /// Ordering for the relational operators. Numbers compare across int/float; otherwise both
    /// sides must be of the same scalar type.
    pub fn compare(&self, v: &Var) -> Result<Ordering, Error> {
        match (self.variant(), v.variant()) {
            (Variant::Int(l), Variant::Int(r)) => Ok(l.cmp(r)),
            (Variant::Float(l), Variant::Float(r)) => Ok(l.total_cmp(r)),
            (Variant::Int(l), Variant::Float(r)) => Ok((*l as f64).total_cmp(r)),
            (Variant::Float(l), Variant::Int(r)) => Ok(l.total_cmp(&(*r as f64))),
            (Variant::Str(l), Variant::Str(r)) => Ok(l.cmp(r)),
            (Variant::Obj(l), Variant::Obj(r)) => Ok(l.cmp(r)),
            (Variant::Err(l), Variant::Err(r)) => Ok(l.err_type.cmp(&r.err_type)),
            (_, _) => Err(E_TYPE.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{E_DIV, E_TYPE, Error, v_float, v_int, v_list, v_none, v_objid, v_str};
    use std::cmp::Ordering;

    #[test]
    fn test_add() {
        assert_eq!(v_int(1).add(&v_int(2)), Ok(v_int(3)));
        assert_eq!(v_int(1).add(&v_float(2.0)), Ok(v_float(3.0)));
        assert_eq!(v_float(1.).add(&v_int(2)), Ok(v_float(3.)));
        assert_eq!(v_str("a").add(&v_str("b")), Ok(v_str("ab")));
        assert_eq!(
            v_list(&[v_int(1)]).add(&v_list(&[v_int(2)])),
            Ok(v_list(&[v_int(1), v_int(2)]))
        );
        assert_eq!(v_str("a").add(&v_int(1)).unwrap_err(), E_TYPE);
    }

    #[test]
    fn test_sub_mul() -> Result<(), Error> {
        assert_eq!(v_int(1).sub(&v_int(2))?, v_int(-1));
        assert_eq!(v_float(1.).sub(&v_int(2))?, v_float(-1.));
        assert_eq!(v_int(3).mul(&v_int(2))?, v_int(6));
        assert_eq!(v_int(1).mul(&v_float(2.))?, v_float(2.));
        Ok(())
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(v_int(1).div(&v_int(0)).unwrap_err(), E_DIV);
        assert_eq!(v_float(1.).div(&v_float(0.0)).unwrap_err(), E_DIV);
        assert_eq!(v_int(1).modulus(&v_int(0)).unwrap_err(), E_DIV);
        assert_eq!(v_int(7).div(&v_int(2)), Ok(v_int(3)));
        assert_eq!(v_int(1).div(&v_float(2.)), Ok(v_float(0.5)));
    }

    #[test]
    fn test_pow_and_negative() {
        assert_eq!(v_int(2).pow(&v_int(10)), Ok(v_int(1024)));
        assert_eq!(v_float(2.).pow(&v_int(2)), Ok(v_float(4.)));
        assert_eq!(v_int(1).negative(), Ok(v_int(-1)));
        assert_eq!(v_none().negative().unwrap_err(), E_TYPE);
    }

    #[test]
    fn test_compare() {
        assert_eq!(v_int(1).compare(&v_float(1.5)), Ok(Ordering::Less));
        assert_eq!(v_str("b").compare(&v_str("a")), Ok(Ordering::Greater));
        assert_eq!(v_objid(1).compare(&v_objid(1)), Ok(Ordering::Equal));
        assert_eq!(v_int(1).compare(&v_str("1")).unwrap_err(), E_TYPE);
    }
}
