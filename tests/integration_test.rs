// tests/integration_test.rs

//! Integration tests for pkgtools
//!
//! These tests verify end-to-end functionality across modules: archives are
//! built with the same tar/gzip stack the tool reads, installed under a
//! temporary root and round-tripped through the manifest database.

use flate2::Compression;
use flate2::write::GzEncoder;
use pkgtools::{DB_PATH, Database, Error, Options, Package, REJECT_CONF};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

enum Member<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
    Link(&'a str, &'a str),
}

fn build_archive(dir: &Path, file_name: &str, members: &[Member]) -> PathBuf {
    let path = dir.join(file_name);
    let file = File::create(&path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for member in members {
        let mut header = tar::Header::new_gnu();
        match member {
            Member::Dir(name) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, name, io::empty()).unwrap();
            }
            Member::File(name, data) => {
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                builder.append_data(&mut header, name, *data).unwrap();
            }
            Member::Link(name, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder.append_link(&mut header, name, target).unwrap();
            }
        }
    }

    builder.into_inner().unwrap().finish().unwrap();
    path
}

fn test_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(DB_PATH)).unwrap();
    dir
}

fn rpaths(pkg: &Package) -> Vec<&str> {
    pkg.entries.iter().map(|pe| pe.rpath.as_str()).collect()
}

#[test]
fn test_install_then_load_round_trip() {
    let dir = test_root();
    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[
            Member::Dir("./bin/"),
            Member::File("./bin/x", b"binary"),
            Member::File("etc/y", b"config"),
        ],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let root = db.root().to_path_buf();

    let pkg = Package::from_archive(&db, &archive).unwrap();
    assert_eq!(pkg.name, "demo");
    assert_eq!(pkg.version, Some("1.0".to_string()));
    db.install(pkg, Options::default()).unwrap();

    // files landed under the root
    assert_eq!(fs::read_to_string(root.join("bin/x")).unwrap(), "binary");
    assert_eq!(fs::read_to_string(root.join("etc/y")).unwrap(), "config");

    // manifest lists the members in archive order, `./` stripped
    let manifest = fs::read_to_string(root.join(DB_PATH).join("demo#1.0")).unwrap();
    assert_eq!(manifest, "bin/\nbin/x\netc/y\n");

    // the in-process collection was updated too
    assert_eq!(db.packages().len(), 1);

    // a fresh database sees the same ordered entry set
    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    assert_eq!(db.packages().len(), 1);
    assert_eq!(rpaths(&db.packages()[0]), ["bin/", "bin/x", "etc/y"]);
}

#[test]
fn test_collision_check_on_installed_package() {
    let dir = test_root();
    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[
            Member::Dir("bin/"),
            Member::File("bin/x", b"one"),
            Member::File("etc/y", b"two"),
        ],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let pkg = Package::from_archive(&db, &archive).unwrap();
    db.install(pkg, Options::default()).unwrap();

    // every non-directory target collides now, and keeps colliding
    for _ in 0..2 {
        let again = Package::from_archive(&db, &archive).unwrap();
        match again.collisions() {
            Err(Error::Collision { paths }) => assert_eq!(paths.len(), 2),
            other => panic!("expected collision error, got {other:?}"),
        }
    }

    // force mode proceeds regardless and overwrites
    let again = Package::from_archive(&db, &archive).unwrap();
    db.install(again, Options { force: true }).unwrap();
    assert_eq!(fs::read_to_string(db.root().join("bin/x")).unwrap(), "one");
}

#[test]
fn test_force_install_overwrites_existing_files() {
    let dir = test_root();
    fs::create_dir(dir.path().join("bin")).unwrap();
    fs::write(dir.path().join("bin/x"), "old").unwrap();

    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[Member::Dir("bin/"), Member::File("bin/x", b"new")],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let pkg = Package::from_archive(&db, &archive).unwrap();

    assert!(pkg.collisions().is_err());
    db.install(pkg, Options { force: true }).unwrap();
    assert_eq!(fs::read_to_string(db.root().join("bin/x")).unwrap(), "new");
}

#[test]
fn test_reject_rules_exclude_members_from_install() {
    let dir = test_root();
    let conf = dir.path().join(REJECT_CONF);
    fs::create_dir_all(conf.parent().unwrap()).unwrap();
    fs::write(&conf, "^etc/\n").unwrap();

    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[
            Member::Dir("bin/"),
            Member::File("bin/x", b"kept"),
            Member::File("etc/y", b"rejected"),
        ],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let pkg = Package::from_archive(&db, &archive).unwrap();
    assert_eq!(rpaths(&pkg), ["bin/", "bin/x"]);
    db.install(pkg, Options::default()).unwrap();

    // the rejected member was neither extracted nor recorded
    assert!(!db.root().join("etc/y").exists());
    let manifest = fs::read_to_string(db.root().join(DB_PATH).join("demo#1.0")).unwrap();
    assert_eq!(manifest, "bin/\nbin/x\n");

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    assert_eq!(rpaths(&db.packages()[0]), ["bin/", "bin/x"]);
}

#[test]
fn test_remove_without_force_spares_directories_and_symlinks() {
    let dir = test_root();
    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[
            Member::Dir("bin/"),
            Member::File("bin/x", b"data"),
            Member::Link("bin/link", "x"),
        ],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let root = db.root().to_path_buf();
    let pkg = Package::from_archive(&db, &archive).unwrap();
    db.install(pkg, Options::default()).unwrap();
    assert!(root.join("bin/link").symlink_metadata().is_ok());

    assert!(db.remove("demo", Options::default()).unwrap());

    assert!(!root.join("bin/x").exists());
    assert!(root.join("bin").is_dir(), "directories are ignored without force");
    assert!(
        root.join("bin/link").symlink_metadata().is_ok(),
        "symlinks are ignored without force"
    );
    assert!(!root.join(DB_PATH).join("demo#1.0").exists());

    // the package moved to the removed collection for inspection
    assert!(db.packages().is_empty());
    assert_eq!(db.removed().len(), 1);
    assert_eq!(db.removed()[0].name, "demo");
}

#[test]
fn test_remove_with_force_deletes_symlinks_and_prunes() {
    let dir = test_root();
    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[
            Member::Dir("bin/"),
            Member::File("bin/x", b"data"),
            Member::Link("bin/link", "x"),
        ],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let root = db.root().to_path_buf();
    let pkg = Package::from_archive(&db, &archive).unwrap();
    db.install(pkg, Options::default()).unwrap();

    assert!(db.remove("demo", Options { force: true }).unwrap());

    assert!(!root.join("bin/x").exists());
    assert!(root.join("bin/link").symlink_metadata().is_err());
    assert!(!root.join("bin").exists(), "empty directory is pruned");
}

#[test]
fn test_shared_directory_survives_until_last_owner_is_removed() {
    let dir = test_root();
    let alpha = build_archive(
        dir.path(),
        "alpha#1.0.pkg.tgz",
        &[Member::Dir("share/"), Member::File("share/a", b"a")],
    );
    let beta = build_archive(
        dir.path(),
        "beta#1.0.pkg.tgz",
        &[Member::Dir("share/"), Member::File("share/b", b"b")],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let root = db.root().to_path_buf();
    let pkg = Package::from_archive(&db, &alpha).unwrap();
    db.install(pkg, Options::default()).unwrap();
    let pkg = Package::from_archive(&db, &beta).unwrap();
    db.install(pkg, Options::default()).unwrap();

    assert_eq!(db.count_links(&root.join("share/")), 2);
    assert_eq!(db.count_links(&root.join("share/a")), 1);

    assert!(db.remove("alpha", Options { force: true }).unwrap());
    assert!(!root.join("share/a").exists());
    assert!(
        root.join("share").is_dir(),
        "directory still referenced by beta must not be pruned"
    );
    assert_eq!(db.count_links(&root.join("share/")), 1);

    assert!(db.remove("beta", Options { force: true }).unwrap());
    assert!(!root.join("share").exists(), "last owner prunes the directory");
}

#[test]
fn test_owner_lookup_matches_hard_link_aliases() {
    let dir = test_root();
    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[Member::Dir("bin/"), Member::File("bin/x", b"data")],
    );

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let root = db.root().to_path_buf();
    let pkg = Package::from_archive(&db, &archive).unwrap();
    db.install(pkg, Options::default()).unwrap();

    let owners = db.owners(&root.join("bin/x")).unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].name, "demo");

    // a hard link has a different path but the same device and inode
    fs::hard_link(root.join("bin/x"), root.join("bin/y")).unwrap();
    let owners = db.owners(&root.join("bin/y")).unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].name, "demo");

    assert!(db.owners(&root.join("bin/missing")).is_err());
}

#[test]
fn test_archive_with_invalid_filename_is_rejected() {
    let dir = test_root();
    // only one dot-suffix
    let archive = build_archive(dir.path(), "demo.tgz", &[Member::File("bin/x", b"data")]);

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let err = Package::from_archive(&db, &archive).unwrap_err();
    assert!(matches!(err, Error::InvalidFilename(_)));
}

#[test]
fn test_removal_honors_reject_rules() {
    let dir = test_root();
    let archive = build_archive(
        dir.path(),
        "demo#1.0.pkg.tgz",
        &[
            Member::Dir("bin/"),
            Member::File("bin/x", b"data"),
            Member::File("bin/keep.conf", b"local"),
        ],
    );

    // install everything first, then add a reject rule before removal
    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    let root = db.root().to_path_buf();
    let pkg = Package::from_archive(&db, &archive).unwrap();
    db.install(pkg, Options::default()).unwrap();

    let conf = root.join(REJECT_CONF);
    fs::create_dir_all(conf.parent().unwrap()).unwrap();
    fs::write(&conf, "\\.conf$\n").unwrap();

    let mut db = Database::new(dir.path()).unwrap();
    db.load().unwrap();
    assert!(db.remove("demo", Options::default()).unwrap());

    assert!(!root.join("bin/x").exists());
    assert!(
        root.join("bin/keep.conf").exists(),
        "reject-matched entries must not be removed"
    );
}
