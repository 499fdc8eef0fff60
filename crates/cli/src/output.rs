// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formats for the status and list commands
//!
//! Text output uses each type's `Display`; JSON output serializes the same
//! value, so scripts get every field the human view summarizes.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn print<T: Serialize + std::fmt::Display>(self, value: &T) {
        match self {
            OutputFormat::Text => println!("{}", value),
            OutputFormat::Json => print_json(value),
        }
    }

    pub fn print_all<T: Serialize + std::fmt::Display>(self, items: &[T]) {
        match self {
            OutputFormat::Text => {
                for item in items {
                    println!("{}", item);
                }
            }
            OutputFormat::Json => print_json(&items),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}
