use dupfind::cli::MaskArgs;
use dupfind::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, FinderError};
use dupfind::file::{ContentHasher, FileAccessor, HashAlgorithm};
use dupfind::mask::{Family, MaskEngine, Polarity, SizeRange, Target};
use dupfind::scanner::{ScanEvents, ScanRoot};
use dupfind::{build_masks, RunMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn names(group: &DuplicateGroup) -> Vec<String> {
    let mut names: Vec<String> = group
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn finder(masks: MaskEngine) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_io_threads(2), masks)
}

#[test]
fn test_buffered_and_mapped_access_agree() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let a = write(dir.path(), "buffered.bin", &content);
    let b = write(dir.path(), "mapped.bin", &content);

    let mut buffered = FileAccessor::new(&a, 4096);
    let mut mapped = FileAccessor::new(&b, 4096).with_heap_threshold(1024);

    buffered.open().unwrap();
    mapped.open().unwrap();
    assert!(!buffered.is_mapped());
    assert!(mapped.is_mapped());
    buffered.close();
    mapped.close();

    assert!(buffered.compare_to(&mut mapped));
    assert_eq!(
        buffered.compute_hash(&HashAlgorithm::Sha1).unwrap(),
        mapped.compute_hash(&HashAlgorithm::Sha1).unwrap()
    );
    assert_eq!(HashAlgorithm::Sha1.digest(&content), buffered.hash().cloned().unwrap());
}

#[test]
fn test_mapped_files_are_grouped() {
    let dir = tempdir().unwrap();
    let content = vec![b'z'; 2048];
    write(dir.path(), "one.bin", &content);
    write(dir.path(), "two.bin", &content);

    let config = FinderConfig::default().with_heap_threshold(100);
    let report = DuplicateFinder::new(config, MaskEngine::new())
        .find_duplicates(&[dir.path().to_path_buf()], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(names(&report.groups[0]), vec!["one.bin", "two.bin"]);
}

#[test]
fn test_excluded_directory_is_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.log", b"log");
    write(dir.path(), "b.txt", b"text");
    write(dir.path(), "skip_me/c.txt", b"text");

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::DirName, Polarity::Exclude, ["skip_*"])
        .unwrap();

    let root = ScanRoot::validate(dir.path()).unwrap();
    let scan = finder(masks).scan(&[root]);

    assert_eq!(scan.found_count(), 2);
    assert_eq!(scan.ignored, vec![dir.path().join("skip_me")]);
}

#[test]
fn test_one_group_from_three_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "ten_a", b"0123456789");
    write(dir.path(), "ten_b", b"0123456789");
    write(dir.path(), "twenty", b"abcdefghijabcdefghij");

    let report = finder(MaskEngine::new())
        .find_duplicates(&[dir.path().to_path_buf()], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].size, 10);
    assert_eq!(names(&report.groups[0]), vec!["ten_a", "ten_b"]);
    assert_eq!(report.summary.found, 3);
    assert_eq!(report.summary.ready_to_compare, 2);
}

#[test]
fn test_include_mask_without_matches() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.png", b"same");
    write(dir.path(), "b.png", b"same");
    write(dir.path(), "c.gif", b"same");

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::FileName, Polarity::Include, ["*.jpg"])
        .unwrap();
    let finder = finder(masks);

    let scan = finder.scan(&[ScanRoot::validate(dir.path()).unwrap()]);
    assert_eq!(scan.found_count(), 0);
    assert_eq!(scan.ignored_count(), 3);

    let report = finder.detect(scan).unwrap();
    assert!(report.groups.is_empty());
    assert_eq!(report.summary.found, 0);
    assert_eq!(report.summary.ignored, 3);
}

#[test]
fn test_unreadable_file_is_reported_not_grouped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"same");
    write(dir.path(), "b", b"same");
    let vanishing = write(dir.path(), "c", b"same");

    let finder = finder(MaskEngine::new());
    let scan = finder.scan(&[ScanRoot::validate(dir.path()).unwrap()]);
    assert_eq!(scan.ready_to_compare(), 3);

    fs::remove_file(&vanishing).unwrap();
    let report = finder.detect(scan).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(names(&report.groups[0]), vec!["a", "b"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path(), vanishing.as_path());

    let error = report.failed[0].last_error().unwrap();
    assert!(error.os_code().is_some_and(|code| code != 0));
    assert!(report.summary.has_failures());
}

#[test]
fn test_file_roots_bypass_masks() {
    let dir = tempdir().unwrap();
    write(dir.path(), "photos/a.jpg", b"picture");
    let loose = write(dir.path(), "elsewhere/copy.txt", b"picture");

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::FileName, Polarity::Include, ["*.jpg"])
        .unwrap();

    let report = finder(masks)
        .find_duplicates(&[dir.path().join("photos"), loose], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(names(&report.groups[0]), vec!["a.jpg", "copy.txt"]);
}

#[test]
fn test_empty_files_are_duplicates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");
    write(dir.path(), "full", b"x");

    let report = finder(MaskEngine::new())
        .find_duplicates(&[dir.path().to_path_buf()], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].size, 0);
    assert_eq!(names(&report.groups[0]), vec!["empty1", "empty2"]);
    assert_eq!(report.summary.reclaimable_space, 0);
}

#[test]
fn test_size_range_limits_candidates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small1", b"ab");
    write(dir.path(), "small2", b"ab");
    write(dir.path(), "big1", b"abcdefgh");
    write(dir.path(), "big2", b"abcdefgh");

    let mut masks = MaskEngine::new();
    masks.set_size_range(SizeRange::new(Some(4), None).unwrap());

    let report = finder(masks)
        .find_duplicates(&[dir.path().to_path_buf()], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(names(&report.groups[0]), vec!["big1", "big2"]);
    assert_eq!(report.summary.ignored, 2);
}

#[test]
fn test_groups_are_hashed_on_request() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x", b"abc");
    write(dir.path(), "y", b"abc");

    let config = FinderConfig::default().with_group_hash(Some(HashAlgorithm::Sha256));
    let report = DuplicateFinder::new(config, MaskEngine::new())
        .find_duplicates(&[dir.path().to_path_buf()], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(
        report.groups[0].hash.as_ref().map(ToString::to_string).as_deref(),
        Some("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
    );
}

#[test]
fn test_every_invalid_root_is_reported() {
    let dir = tempdir().unwrap();
    let roots = [
        dir.path().to_path_buf(),
        dir.path().join("missing1"),
        dir.path().join("missing2"),
    ];

    let mut reported = Vec::new();
    let result = {
        let mut events =
            ScanEvents::new().on_path_validation_failed(|root, _| reported.push(root.to_string()));
        finder(MaskEngine::new()).find_duplicates(&roots, &mut events)
    };

    assert!(matches!(result, Err(FinderError::InvalidRoot(_))));
    assert_eq!(reported.len(), 2);
    assert!(reported[0].ends_with("missing1"));
    assert!(reported[1].ends_with("missing2"));
}

#[test]
fn test_included_directories_limit_descent_only() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"same");
    write(dir.path(), "keep/b.txt", b"same");
    write(dir.path(), "other/c.txt", b"same");

    let args = MaskArgs {
        include_dirs: vec!["keep".to_string()],
        ..MaskArgs::default()
    };
    let masks = build_masks(RunMode::Compare, &[], &args).unwrap();

    let report = finder(masks)
        .find_duplicates(&[dir.path().to_path_buf()], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.summary.found, 2);
    assert_eq!(report.ignored, vec![dir.path().join("other")]);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(names(&report.groups[0]), vec!["a.txt", "b.txt"]);
}

#[test]
fn test_file_under_two_roots_is_not_its_own_duplicate() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "x.txt", b"abc");
    write(dir.path(), "y.bin", b"xyz");

    let report = finder(MaskEngine::new())
        .find_duplicates(&[dir.path().to_path_buf(), file], &mut ScanEvents::new())
        .unwrap();

    assert_eq!(report.summary.found, 2);
    assert!(report.groups.is_empty());
    assert_eq!(report.summary.reclaimable_space, 0);
}
