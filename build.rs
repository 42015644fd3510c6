// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("pkgtools")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pkgtools Contributors")
        .about("Local package registry: install, remove and query packages")
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .global(true)
                .default_value("/")
                .help("Set alternative installation root"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .subcommand(
            Command::new("install")
                .about("Install packages from archives (gzip/bzip2/xz tar)")
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .num_args(1..)
                        .help("Package archive paths (name[#version].ext1.ext2)"),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Override filesystem checks and force installation"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove installed packages")
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .num_args(1..)
                        .help("Package names"),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Also remove symlinks and prune empty directories"),
                ),
        )
        .subcommand(
            Command::new("owner")
                .about("Show which packages own the given files")
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .help("Files to look up"),
                ),
        )
        .subcommand(Command::new("list").about("List installed packages"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("pkgtools.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
