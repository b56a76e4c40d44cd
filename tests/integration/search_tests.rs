use dupfind::file::{FileAccessor, FilterCriteria, HashAlgorithm};
use dupfind::mask::{Family, MaskEngine, Polarity, Target};
use dupfind::scanner::{ListerKind, ScanEvents};
use dupfind::search::{FileSearch, GroupBy, GroupKey, SearchError, SearchOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::tempdir;

fn write(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn fixture(root: &Path) {
    write(root, "app/logs/today.log", b"INFO start\nERROR panic in worker\n");
    write(root, "app/logs/yesterday.log", b"INFO start\nINFO stop\n");
    write(root, "app/src/main.rs", b"fn main() { panic!() }");
    write(root, "other/logs/old.log", b"ERROR panic again");
    write(root, "binary.dat", &[0x00, 0xFF, 0xFE, 0x10, 0x00]);
}

fn file_masks(patterns: &[&str]) -> MaskEngine {
    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::FileName, Polarity::Include, patterns)
        .unwrap();
    masks
}

fn names(files: &[FileAccessor]) -> Vec<String> {
    let mut names: Vec<String> = files
        .iter()
        .map(|f| f.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn run(search: &FileSearch, root: &Path) -> (Vec<FileAccessor>, usize) {
    let streamed = Mutex::new(0usize);
    let outcome = search
        .run(&[root.to_path_buf()], &mut ScanEvents::new(), &|_: &FileAccessor| {
            *streamed.lock().unwrap() += 1;
        })
        .unwrap();
    let streamed = streamed.into_inner().unwrap();
    (outcome.matched, streamed)
}

#[test]
fn test_content_search_in_logs() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let options = SearchOptions::default()
        .with_criteria(FilterCriteria::new().with_content("panic").unwrap())
        .with_threads(4);
    let search = FileSearch::new(options, file_masks(&["*.log"]));

    let (matched, streamed) = run(&search, dir.path());

    assert_eq!(names(&matched), vec!["old.log", "today.log"]);
    assert_eq!(streamed, 2);
}

#[test]
fn test_search_in_directories_only() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::RecurseInto, Target::DirName, Polarity::Include, ["logs"])
        .unwrap();
    let search = FileSearch::new(SearchOptions::default(), masks);

    let (matched, _) = run(&search, dir.path());

    assert_eq!(names(&matched), vec!["old.log", "today.log", "yesterday.log"]);
}

#[test]
fn test_binary_needle() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let options = SearchOptions::default()
        .with_criteria(FilterCriteria::new().with_content(vec![0xFF, 0xFE]).unwrap());
    let search = FileSearch::new(options, MaskEngine::new());

    let (matched, _) = run(&search, dir.path());

    assert_eq!(names(&matched), vec!["binary.dat"]);
}

#[test]
fn test_hash_allow_list_with_sha256() {
    let dir = tempdir().unwrap();
    write(dir.path(), "abc.txt", b"abc");
    write(dir.path(), "abd.txt", b"abd");

    let options = SearchOptions::default()
        .with_hash_algorithm(HashAlgorithm::Sha256)
        .with_criteria(
            FilterCriteria::new()
                .with_hashes(["ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"])
                .unwrap(),
        );
    let search = FileSearch::new(options, MaskEngine::new());

    let (matched, streamed) = run(&search, dir.path());

    assert_eq!(names(&matched), vec!["abc.txt"]);
    assert_eq!(streamed, 1);
}

#[test]
fn test_content_and_group_by_hash() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one.txt", b"needle here");
    write(dir.path(), "two.txt", b"needle here");
    write(dir.path(), "three.txt", b"needle elsewhere");
    write(dir.path(), "four.txt", b"nothing");

    let options = SearchOptions::default()
        .with_criteria(FilterCriteria::new().with_content("needle").unwrap())
        .with_group_by(Some(GroupBy::Hash))
        .with_threads(3);
    let search = FileSearch::new(options, MaskEngine::new());

    let streamed = Mutex::new(0usize);
    let outcome = search
        .run(&[dir.path().to_path_buf()], &mut ScanEvents::new(), &|_: &FileAccessor| {
            *streamed.lock().unwrap() += 1;
        })
        .unwrap();

    assert_eq!(streamed.into_inner().unwrap(), 0);
    let groups = outcome.grouped(GroupBy::Hash);
    let mut sizes: Vec<usize> = groups.values().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2]);
    assert!(groups.keys().all(|key| matches!(key, GroupKey::Hash(Some(_)))));
}

#[test]
fn test_directory_search_reports_accepted_directories() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::RecurseInto, Target::DirName, Polarity::Include, ["l*"])
        .unwrap();
    let search = FileSearch::new(SearchOptions::default().with_directories_only(true), masks);

    let outcome = search
        .run(&[dir.path().to_path_buf()], &mut ScanEvents::new(), &|_: &FileAccessor| {})
        .unwrap();

    let mut directories = outcome.directories.clone();
    directories.sort();
    assert_eq!(
        directories,
        vec![
            dir.path().join("app").join("logs"),
            dir.path().join("other").join("logs")
        ]
    );
    assert_eq!(outcome.found_count(true), 2);
}

#[test]
fn test_compatibility_lister_finds_the_same_files() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let standard = FileSearch::new(SearchOptions::default(), file_masks(&["*.log"]));
    let legacy = FileSearch::new(
        SearchOptions::default().with_lister(ListerKind::Compatibility),
        file_masks(&["*.log"]),
    );

    assert_eq!(names(&run(&standard, dir.path()).0), names(&run(&legacy, dir.path()).0));
}

#[test]
fn test_missing_root_refuses_search() {
    let dir = tempdir().unwrap();
    let search = FileSearch::new(SearchOptions::default(), MaskEngine::new());

    let mut reported = 0;
    let result = {
        let mut events = ScanEvents::new().on_path_validation_failed(|_, _| reported += 1);
        search.run(&[dir.path().join("nope")], &mut events, &|_: &FileAccessor| {})
    };

    assert!(matches!(result, Err(SearchError::InvalidRoot(_))));
    assert_eq!(reported, 1);
}

#[test]
fn test_overlapping_roots_match_once() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    let search = FileSearch::new(SearchOptions::default(), file_masks(&["*.log"]));

    let streamed = Mutex::new(0usize);
    let outcome = search
        .run(
            &[dir.path().to_path_buf(), dir.path().join("app")],
            &mut ScanEvents::new(),
            &|_: &FileAccessor| *streamed.lock().unwrap() += 1,
        )
        .unwrap();

    assert_eq!(names(&outcome.matched), vec!["old.log", "today.log", "yesterday.log"]);
    assert_eq!(streamed.into_inner().unwrap(), 3);
    assert_eq!(outcome.stats.repeated, 2);
}
