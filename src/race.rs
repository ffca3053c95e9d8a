//! First-success race of two fallible futures
//!
//! `race_ok` polls both futures concurrently and returns the first `Ok`.
//! A failed branch does not end the race; the other branch keeps running.
//! Only when both have failed is `RaceError` returned, carrying both errors.
//!
//! Dropping the race drops whichever future is still pending. Work that must
//! outlive the race should be spawned and raced through its `JoinHandle`.

use std::fmt;
use std::future::Future;

/// Which branch produced the winning value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    First,
    Second,
}

/// Successful race outcome
#[derive(Debug)]
pub struct RaceWin<T> {
    pub value: T,
    pub branch: Branch,
}

/// Both branches failed
#[derive(Debug)]
pub struct RaceError<E1, E2> {
    pub first: E1,
    pub second: E2,
}

impl<E1: fmt::Display, E2: fmt::Display> fmt::Display for RaceError<E1, E2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "both branches failed (first: {}; second: {})",
            self.first, self.second
        )
    }
}

impl<E1, E2> std::error::Error for RaceError<E1, E2>
where
    E1: fmt::Debug + fmt::Display,
    E2: fmt::Debug + fmt::Display,
{
}

/// Race two futures; succeed on the first success, fail only when both fail
pub async fn race_ok<T, E1, E2, A, B>(first: A, second: B) -> Result<RaceWin<T>, RaceError<E1, E2>>
where
    A: Future<Output = Result<T, E1>>,
    B: Future<Output = Result<T, E2>>,
{
    tokio::pin!(first);
    tokio::pin!(second);

    let mut first_err: Option<E1> = None;
    let mut second_err: Option<E2> = None;

    loop {
        tokio::select! {
            result = &mut first, if first_err.is_none() => match result {
                Ok(value) => return Ok(RaceWin { value, branch: Branch::First }),
                Err(e) => first_err = Some(e),
            },
            result = &mut second, if second_err.is_none() => match result {
                Ok(value) => return Ok(RaceWin { value, branch: Branch::Second }),
                Err(e) => second_err = Some(e),
            },
        }

        match (first_err.take(), second_err.take()) {
            (Some(first), Some(second)) => return Err(RaceError { first, second }),
            (a, b) => {
                first_err = a;
                second_err = b;
            }
        }
    }
}
