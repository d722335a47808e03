use std::cmp::Ordering;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Text(&'a str),
    Digits(&'a str),
}

impl<'a> Run<'a> {
    fn as_str(&self) -> &'a str {
        match *self {
            Run::Text(s) | Run::Digits(s) => s,
        }
    }
}

struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Run<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits { Run::Digits(run) } else { Run::Text(run) })
    }
}

fn runs(s: &str) -> Runs<'_> {
    Runs { rest: s }
}

/// Compare digit runs by integer value without parsing, so arbitrarily long
/// runs never overflow.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a_value = a.trim_start_matches('0');
    let b_value = b.trim_start_matches('0');
    a_value
        .len()
        .cmp(&b_value.len())
        .then_with(|| a_value.cmp(b_value))
}

/// Natural string order: `f1 < f2 < f10 < f11`.
///
/// Digit runs compare by value; leading zeros only break ties between
/// otherwise equal names (fewer zeros first). Falls back to plain string
/// order so the result is total.
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);
    let mut zero_tiebreak = Ordering::Equal;

    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Run::Digits(x)), Some(Run::Digits(y))) => {
                let ord = compare_numeric(x, y);
                if ord == Ordering::Equal && zero_tiebreak == Ordering::Equal {
                    zero_tiebreak = x.len().cmp(&y.len());
                }
                ord
            }
            (Some(x), Some(y)) => x.as_str().cmp(y.as_str()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    zero_tiebreak.then_with(|| a.cmp(b))
}

/// Sort paths naturally by their full textual form.
pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| compare(&a.to_string_lossy(), &b.to_string_lossy()));
}
