// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! A line-oriented directive runtime
//!
//! Each non-empty line of a `.src` unit is one directive:
//!
//! ```text
//! # comment
//! require net/http
//! load ./setup.src
//! provide legacy_feature
//! print hello
//! raise something went wrong
//! exit 3
//! ```

use spacey_load::{LoadContext, LoadError, Result, Runtime};
use tracing::debug;

/// One parsed line
#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Require(&'a str),
    Load(&'a str),
    Provide(&'a str),
    Print(&'a str),
    Raise(&'a str),
    Exit(i32),
}

impl<'a> Directive<'a> {
    /// Parse a line; blank lines and comments yield `None`
    fn parse(line: &'a str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (keyword, arg) = line
            .split_once(char::is_whitespace)
            .map(|(k, a)| (k, a.trim()))
            .unwrap_or((line, ""));

        let directive = match keyword {
            "require" => Directive::Require(arg),
            "load" => Directive::Load(arg),
            "provide" => Directive::Provide(arg),
            "print" => Directive::Print(arg),
            "raise" => Directive::Raise(arg),
            "exit" => Directive::Exit(
                arg.parse()
                    .map_err(|_| format!("invalid exit status '{}'", arg))?,
            ),
            other => return Err(format!("unknown directive '{}'", other)),
        };
        Ok(Some(directive))
    }
}

/// Runs directive scripts
#[derive(Debug, Default)]
pub struct ScriptRuntime;

impl Runtime for ScriptRuntime {
    fn eval_source(&self, ctx: &LoadContext<'_>, name: &str, source: &str) -> Result<()> {
        for (lineno, line) in source.lines().enumerate() {
            let directive = Directive::parse(line)
                .map_err(|e| LoadError::raised(format!("{}:{}: {}", name, lineno + 1, e)))?;
            let Some(directive) = directive else {
                continue;
            };
            debug!("{}:{}: {:?}", name, lineno + 1, directive);

            match directive {
                Directive::Require(target) => {
                    ctx.require(target)?;
                }
                Directive::Load(target) => ctx.load(target, ctx.isolate())?,
                Directive::Provide(feature) => {
                    ctx.service().provide(feature);
                }
                Directive::Print(text) => println!("{}", text),
                Directive::Raise(message) => return Err(LoadError::raised(message)),
                Directive::Exit(status) => return Err(LoadError::Exit(status)),
            }
        }
        Ok(())
    }
}
