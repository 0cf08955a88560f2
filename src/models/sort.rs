//! Deterministic ordering shared by group trees and the provider catalog
//!
//! Mods rely on a stable listing order across restarts, so the comparison used
//! everywhere is part of the documented contract: digit runs compare as
//! numbers, everything else case-insensitively.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Alphanumeric-natural comparison: `"Mod 2"` sorts before `"Mod 10"`
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    let mut left_chars = left.chars().peekable();
    let mut right_chars = right.chars().peekable();

    loop {
        match (left_chars.peek().copied(), right_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                if l.is_ascii_digit() && r.is_ascii_digit() {
                    let left_run = take_digit_run(&mut left_chars);
                    let right_run = take_digit_run(&mut right_chars);
                    match compare_digit_runs(&left_run, &right_run) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    }
                }

                let l_folded = l.to_ascii_lowercase();
                let r_folded = r.to_ascii_lowercase();
                if l_folded != r_folded {
                    return l_folded.cmp(&r_folded);
                }
                left_chars.next();
                right_chars.next();
            }
        }
    }
}

fn take_digit_run(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            run.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    run
}

/// Numeric comparison of digit runs without parsing, so arbitrarily long runs
/// cannot overflow.
fn compare_digit_runs(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}
