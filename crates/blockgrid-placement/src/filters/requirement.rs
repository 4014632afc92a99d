//! Capability requirement expressions.
//!
//! A requirement is either a bare value (exact string match) or an
//! operator followed by operands:
//!
//! | Operator | Passes when |
//! |---|---|
//! | `=` | value ≥ operand (numeric) |
//! | `==` `!=` `>=` `<=` | numeric comparison |
//! | `s==` `s!=` `s<` `s<=` `s>` `s>=` | string comparison |
//! | `<in>` | operand is a substring of value |
//! | `<is>` | value and operand are the same boolean |
//! | `<or>` | value equals any of the `<or>`-separated operands |
//!
//! A host that does not report the capability never matches.

use std::cmp::Ordering;

/// Does a host's capability `value` satisfy `requirement`?
pub fn matches(value: Option<&str>, requirement: &str) -> bool {
    let Some(value) = value else {
        return false;
    };

    let mut words = requirement.split_whitespace();
    let Some(op) = words.next() else {
        return value == requirement;
    };

    match op {
        "<or>" => words.step_by(2).any(|w| w == value),
        "<in>" => words.next().is_some_and(|w| value.contains(w)),
        "<is>" => words
            .next()
            .is_some_and(|w| parse_bool(value) == parse_bool(w)),
        "=" | "==" | "!=" | ">=" | "<=" => {
            let Some(operand) = words.next() else {
                return false;
            };
            let (Ok(v), Ok(o)) = (value.parse::<f64>(), operand.parse::<f64>()) else {
                return false;
            };
            match op {
                "=" | ">=" => v >= o,
                "==" => v == o,
                "!=" => v != o,
                _ => v <= o,
            }
        }
        "s==" | "s!=" | "s<" | "s<=" | "s>" | "s>=" => {
            let Some(operand) = words.next() else {
                return false;
            };
            let ord = value.cmp(operand);
            match op {
                "s==" => ord == Ordering::Equal,
                "s!=" => ord != Ordering::Equal,
                "s<" => ord == Ordering::Less,
                "s<=" => ord != Ordering::Greater,
                "s>" => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }
        }
        _ => value == requirement,
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "on" | "t"
    )
}
