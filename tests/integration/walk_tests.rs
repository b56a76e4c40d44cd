use dupfind::mask::{Family, MaskEngine, Polarity, Target};
use dupfind::scanner::{
    validate_roots, DirectoryLister, ListedEntry, ListerKind, Listing, ScanEvents, ScanRoot, Walker,
};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn tree(root: &Path) {
    for (relative, content) in [
        ("top.txt", &b"top"[..]),
        ("docs/readme.md", b"readme"),
        ("docs/guide.txt", b"guide"),
        ("docs/deep/notes.txt", b"notes"),
        ("build/out.o", b"object"),
    ] {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn walk(masks: MaskEngine, kind: ListerKind, root: &Path) -> (BTreeSet<PathBuf>, Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = BTreeSet::new();
    let mut ignored = Vec::new();
    let mut directories = Vec::new();
    {
        let mut events = ScanEvents::new()
            .on_file_accepted(|path, _| {
                files.insert(path);
            })
            .on_object_ignored(|path| ignored.push(path.to_path_buf()))
            .on_directory_accepted(|path| directories.push(path.to_path_buf()));
        let root = ScanRoot::validate(root).unwrap();
        Walker::with_lister_kind(masks, kind).walk(&root, &mut events);
    }
    directories.sort();
    (files, ignored, directories)
}

#[test]
fn test_listers_agree() {
    let dir = tempdir().unwrap();
    tree(dir.path());

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::DirName, Polarity::Exclude, ["build"])
        .unwrap();

    let standard = walk(masks.clone(), ListerKind::Standard, dir.path());
    let compatibility = walk(masks, ListerKind::Compatibility, dir.path());

    assert_eq!(standard, compatibility);
    assert_eq!(standard.0.len(), 4);
    assert_eq!(standard.1, vec![dir.path().join("build")]);
}

#[test]
fn test_recurse_into_rules_keep_walking() {
    let dir = tempdir().unwrap();
    tree(dir.path());

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::RecurseInto, Target::DirName, Polarity::Include, ["deep"])
        .unwrap();

    let (files, ignored, directories) = walk(masks, ListerKind::Standard, dir.path());

    assert_eq!(
        files.into_iter().collect::<Vec<_>>(),
        vec![dir.path().join("docs").join("deep").join("notes.txt")]
    );
    assert!(ignored.is_empty());
    assert_eq!(directories, vec![dir.path().join("docs").join("deep")]);
}

#[test]
fn test_full_path_exclusion() {
    let dir = tempdir().unwrap();
    tree(dir.path());

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::FullPath, Polarity::Exclude, ["*docs*"])
        .unwrap();

    let (files, ignored, _) = walk(masks, ListerKind::Standard, dir.path());

    assert_eq!(files.len(), 2);
    assert_eq!(ignored, vec![dir.path().join("docs")]);
}

struct BrokenLister;

impl DirectoryLister for BrokenLister {
    fn list(&self, dir: &Path) -> Listing {
        if dir.ends_with("docs") {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        ListerKind::Standard.build().list(dir)
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn test_subtree_error_does_not_stop_the_walk() {
    let dir = tempdir().unwrap();
    tree(dir.path());

    let mut files = Vec::new();
    let mut errors = Vec::new();
    let stats = {
        let mut events = ScanEvents::new()
            .on_file_accepted(|path, _| files.push(path))
            .on_scan_subtree_error(|e| errors.push(e.to_string()));
        let root = ScanRoot::validate(dir.path()).unwrap();
        Walker::with_lister(MaskEngine::new(), Box::new(BrokenLister)).walk(&root, &mut events)
    };

    assert_eq!(errors.len(), 1);
    assert_eq!(stats.errors, 1);
    files.sort();
    assert_eq!(
        files,
        vec![dir.path().join("build").join("out.o"), dir.path().join("top.txt")]
    );
}

#[test]
fn test_validate_roots_keeps_order() {
    let dir = tempdir().unwrap();
    tree(dir.path());
    let raw = vec![dir.path().join("docs"), dir.path().join("top.txt")];

    let roots = validate_roots(&raw, &mut ScanEvents::new()).unwrap();

    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].path(), raw[0].as_path());
    assert_eq!(roots[1].path(), raw[1].as_path());
}

#[test]
fn test_listed_entries_carry_sizes() {
    let dir = tempdir().unwrap();
    tree(dir.path());

    let listing: Vec<ListedEntry> = ListerKind::Standard
        .build()
        .list(dir.path())
        .unwrap()
        .into_iter()
        .filter_map(Result::ok)
        .collect();

    let top = listing
        .iter()
        .find(|entry| entry.path.ends_with("top.txt"))
        .unwrap();
    assert!(!top.is_dir);
    assert_eq!(top.size, 3);
}
