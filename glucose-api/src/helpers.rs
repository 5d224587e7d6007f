use crate::problem::{Problem, NOT_FOUND};

pub fn some_or_not_found<T>(r: Option<T>) -> Result<T, Problem> {
    r.ok_or(NOT_FOUND)
}
