// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! `setup`: installs, updates, reports on, or removes a UEFI boot manager on an EFI System
//! Partition.

mod boot_option;
mod cli;
mod copy;
mod device_path;
mod error;
mod esp;
mod fw_vars;
mod install;
mod loader_info;
mod udev;

use std::process::ExitCode;

use clap::Parser;
use log::error;

use cli::{Args, Verb};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: &Args) -> error::InstallResult<()> {
    let touch_variables = !args.no_variables;
    let verb = args.verb.unwrap_or_default();

    match verb {
        Verb::Status => install::status(&args.path, touch_variables),
        Verb::Install => install::install_or_update(&args.path, true, touch_variables),
        Verb::Update => install::install_or_update(&args.path, false, touch_variables),
        Verb::Remove => install::remove(&args.path, touch_variables),
    }
}
