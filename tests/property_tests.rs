use proptest::prelude::*;
use dupfind::duplicates::{group_by_size, partition_bucket};
use dupfind::file::{FileAccessor, HashAlgorithm};
use dupfind::mask::{Family, MaskEngine, Polarity, SizeRange, Target};
use dupfind::scanner::FilesystemObject;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn include_file_masks(pattern: &str) -> MaskEngine {
    let mut masks = MaskEngine::new();
    masks
        .add_rules(Family::Consider, Target::FileName, Polarity::Include, [pattern])
        .unwrap();
    masks
}

fn is_ignored(masks: &MaskEngine, name: &str) -> bool {
    masks.evaluate(
        Family::Consider,
        Target::FileName,
        &FilesystemObject::file(format!("/root/{}", name), 1),
    )
}

proptest! {
    #[test]
    fn test_literal_pattern_matches_ignoring_case(name in "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,15}") {
        let masks = include_file_masks(&name);

        prop_assert!(!is_ignored(&masks, &name.to_uppercase()));
        prop_assert!(!is_ignored(&masks, &name.to_lowercase()));
        let longer = format!("{}x", name);
        prop_assert!(is_ignored(&masks, &longer));
    }

    #[test]
    fn test_star_extension_pattern(stem in "[a-z0-9_]{0,10}", ext in "[a-z]{1,4}") {
        let masks = include_file_masks(&format!("*.{}", ext));

        let lower = format!("{}.{}", stem, ext);
        let upper = lower.to_uppercase();
        let backup = format!("{}.bak", lower);
        prop_assert!(!is_ignored(&masks, &lower));
        prop_assert!(!is_ignored(&masks, &upper));
        prop_assert!(is_ignored(&masks, &backup));
    }

    #[test]
    fn test_size_range_applies_to_files_only(
        size in 0u64..2000,
        min in prop::option::of(0u64..1000),
        span in prop::option::of(0u64..1000),
    ) {
        let max = span.map(|span| min.unwrap_or(0) + span);
        let mut masks = MaskEngine::new();
        masks.set_size_range(SizeRange::new(min, max).unwrap());

        let inside = min.map_or(true, |min| size >= min) && max.map_or(true, |max| size <= max);
        let file = FilesystemObject::file("/root/file.bin", size);
        prop_assert_eq!(masks.evaluate(Family::Consider, Target::FileName, &file), !inside);

        let directory = FilesystemObject::directory("/root/dir");
        prop_assert!(!masks.evaluate(Family::Consider, Target::DirName, &directory));
    }

    #[test]
    fn test_compare_is_symmetric(
        first in prop::collection::vec(any::<u8>(), 0..64),
        second in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, &first).unwrap();
        fs::write(&b, &second).unwrap();

        let mut fa = FileAccessor::new(&a, first.len() as u64);
        let mut fb = FileAccessor::new(&b, second.len() as u64).with_heap_threshold(16);

        let ab = fa.compare_to(&mut fb);
        let ba = fb.compare_to(&mut fa);
        prop_assert_eq!(ab, ba);
        prop_assert_eq!(ab, first == second);
    }

    #[test]
    fn test_hash_independent_of_access_path(content in prop::collection::vec(any::<u8>(), 0..256)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, &content).unwrap();

        let size = content.len() as u64;
        let mut buffered = FileAccessor::new(&path, size);
        let mut mapped = FileAccessor::new(&path, size).with_heap_threshold(0);

        prop_assert_eq!(
            buffered.compute_hash(&HashAlgorithm::Blake3).unwrap(),
            mapped.compute_hash(&HashAlgorithm::Blake3).unwrap()
        );
    }

    #[test]
    fn test_partition_independent_of_order(kinds in prop::collection::vec(0usize..3, 0..8)) {
        const CONTENTS: [&[u8]; 3] = [b"aaaa", b"bbbb", b"cccc"];
        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| {
                let path = dir.path().join(format!("f{}", i));
                fs::write(&path, CONTENTS[kind]).unwrap();
                path
            })
            .collect();

        let clusters = |order: Vec<&std::path::PathBuf>| -> BTreeSet<Vec<String>> {
            let files = order.into_iter().map(|p| FileAccessor::new(p, 4)).collect();
            let (groups, failed) = partition_bucket(4, files);
            assert!(failed.is_empty());
            groups
                .iter()
                .map(|group| {
                    let mut names: Vec<String> = group
                        .paths()
                        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                        .collect();
                    names.sort();
                    names
                })
                .collect()
        };

        let forward = clusters(paths.iter().collect());
        let backward = clusters(paths.iter().rev().collect());
        prop_assert_eq!(&forward, &backward);

        // Every kind that occurs at least twice forms exactly one group
        let repeated = (0..3).filter(|k| kinds.iter().filter(|&x| x == k).count() > 1).count();
        prop_assert_eq!(forward.len(), repeated);
    }

    #[test]
    fn test_group_by_size_invariants(sizes in prop::collection::vec(0u64..100, 0..50)) {
        let files: Vec<FileAccessor> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| FileAccessor::new(format!("/fake/path/{}", i), size))
            .collect();

        let (buckets, stats) = group_by_size(files);

        for (size, files) in &buckets {
            for file in files {
                prop_assert_eq!(file.size(), *size);
            }
        }
        prop_assert_eq!(stats.total_files, sizes.len());
        prop_assert_eq!(stats.potential_duplicates + stats.eliminated_unique, sizes.len());
        prop_assert_eq!(stats.unique_sizes, sizes.iter().collect::<BTreeSet<_>>().len());
    }
}
