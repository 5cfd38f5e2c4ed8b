//! Whitespace-token command parsing.

use std::str::FromStr;

use nalgebra::{Point3, Vector3};

use crate::CommandError;

/// A whitespace-tokenized keyword stream.
pub(crate) struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace(),
        }
    }

    /// Next raw token, if any.
    pub fn next(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    /// Parse the next token as the argument of `keyword`.
    pub fn arg<T: FromStr>(&mut self, keyword: &str) -> Result<T, CommandError> {
        let token = self.next().ok_or_else(|| CommandError::MissingArgument {
            keyword: keyword.to_owned(),
        })?;
        token.parse().map_err(|_| CommandError::InvalidArgument {
            keyword: keyword.to_owned(),
            value: token.to_owned(),
        })
    }

    /// Parse three reals as a vector.
    pub fn vector3(&mut self, keyword: &str) -> Result<Vector3<f64>, CommandError> {
        Ok(Vector3::new(
            self.arg(keyword)?,
            self.arg(keyword)?,
            self.arg(keyword)?,
        ))
    }

    /// Parse three reals as a point.
    pub fn point3(&mut self, keyword: &str) -> Result<Point3<f64>, CommandError> {
        Ok(Point3::from(self.vector3(keyword)?))
    }

    /// Parse a boolean argument: `0`/`1`/`false`/`true`.
    pub fn boolean(&mut self, keyword: &str) -> Result<bool, CommandError> {
        let token = self.next().ok_or_else(|| CommandError::MissingArgument {
            keyword: keyword.to_owned(),
        })?;
        match token {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            _ => Err(CommandError::InvalidArgument {
                keyword: keyword.to_owned(),
                value: token.to_owned(),
            }),
        }
    }
}
