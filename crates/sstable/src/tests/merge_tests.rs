use crate::SSTableWriter;
use crate::*;
use anyhow::Result;
use memtable::Memtable;
use tempfile::tempdir;

/// Helper: write a memtable to an SSTable and open a reader.
fn write_and_open(
    dir: &std::path::Path,
    name: &str,
    entries: &[(&[u8], Option<&[u8]>)],
) -> Result<SSTableReader> {
    let path = dir.join(name);
    let mut mem = Memtable::new();
    for &(key, val) in entries {
        match val {
            Some(v) => mem.put(key.to_vec(), v.to_vec()),
            None => mem.delete(key.to_vec()),
        }
    }
    SSTableWriter::write(&path, &mem)?;
    SSTableReader::open(&path)
}

// -------------------- Basic merge --------------------

#[test]
fn merge_single_sstable() -> Result<()> {
    let dir = tempdir()?;
    let r = write_and_open(
        dir.path(),
        "a.sst",
        &[(b"a", Some(b"1")), (b"b", Some(b"2")), (b"c", Some(b"3"))],
    )?;

    let readers = vec![r];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].0, b"a");
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[2].0, b"c");
    Ok(())
}

#[test]
fn merge_two_non_overlapping() -> Result<()> {
    let dir = tempdir()?;
    let r1 = write_and_open(dir.path(), "a.sst", &[(b"a", Some(b"1")), (b"b", Some(b"2"))])?;
    let r2 = write_and_open(dir.path(), "b.sst", &[(b"c", Some(b"3")), (b"d", Some(b"4"))])?;

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 4);
    assert_eq!(result[0].0, b"a");
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[2].0, b"c");
    assert_eq!(result[3].0, b"d");
    Ok(())
}

// -------------------- Many keys --------------------

#[test]
fn merge_many_keys_across_sstables() -> Result<()> {
    let dir = tempdir()?;

    let entries1: Vec<(Vec<u8>, Option<Vec<u8>>)> = (0..100u64)
        .map(|i| (format!("key{:04}", i).into_bytes(), Some(b"v1".to_vec())))
        .collect();
    let refs1: Vec<(&[u8], Option<&[u8]>)> = entries1
        .iter()
        .map(|(k, v)| (k.as_slice(), v.as_deref()))
        .collect();
    let r1 = write_and_open(dir.path(), "1.sst", &refs1)?;

    let entries2: Vec<(Vec<u8>, Option<Vec<u8>>)> = (50..150u64)
        .map(|i| (format!("key{:04}", i).into_bytes(), Some(b"v2".to_vec())))
        .collect();
    let refs2: Vec<(&[u8], Option<&[u8]>)> = entries2
        .iter()
        .map(|(k, v)| (k.as_slice(), v.as_deref()))
        .collect();
    let r2 = write_and_open(dir.path(), "2.sst", &refs2)?;

    // r2 is index 1 (newer) — overlapping keys 50..100 should resolve to v2.
    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 150);

    for (key, value) in &result {
        let key_str = String::from_utf8_lossy(key);
        if let Ok(num) = key_str.trim_start_matches("key").parse::<u64>() {
            if (50..100).contains(&num) {
                assert_eq!(value, &Some(b"v2".to_vec()), "key {} should come from the newer source", num);
            }
        }
    }

    let keys: Vec<&[u8]> = result.iter().map(|(k, _)| k.as_slice()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    Ok(())
}

// -------------------- Three-way merge --------------------

#[test]
fn merge_three_sstables_with_overlap() -> Result<()> {
    let dir = tempdir()?;
    let r1 = write_and_open(dir.path(), "1.sst", &[(b"a", Some(b"v1")), (b"c", Some(b"v1"))])?;
    let r2 = write_and_open(dir.path(), "2.sst", &[(b"b", Some(b"v2")), (b"c", Some(b"v2"))])?;
    let r3 = write_and_open(dir.path(), "3.sst", &[(b"c", Some(b"v3")), (b"d", Some(b"v3"))])?;

    let readers = vec![r1, r2, r3];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 4);
    assert_eq!(result[0].0, b"a");
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[2].0, b"c");
    assert_eq!(result[2].1, Some(b"v3".to_vec())); // r3 has the highest index
    assert_eq!(result[3].0, b"d");

    Ok(())
}

// -------------------- Empty inputs --------------------

#[test]
fn merge_no_readers() -> Result<()> {
    let readers: Vec<SSTableReader> = vec![];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;
    assert!(result.is_empty());
    Ok(())
}

// -------------------- Sorted output --------------------

#[test]
fn merge_output_is_sorted() -> Result<()> {
    let dir = tempdir()?;
    let r1 = write_and_open(
        dir.path(),
        "1.sst",
        &[(b"z", Some(b"1")), (b"m", Some(b"2")), (b"a", Some(b"3"))],
    )?;
    let r2 = write_and_open(dir.path(), "2.sst", &[(b"x", Some(b"4")), (b"b", Some(b"5"))])?;

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    let keys: Vec<&[u8]> = result.iter().map(|(k, _)| k.as_slice()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    Ok(())
}

// -------------------- Deduplication --------------------

#[test]
fn merge_overlapping_keys_newest_source_wins() -> Result<()> {
    let dir = tempdir()?;

    let r1 = write_and_open(dir.path(), "old.sst", &[(b"key", Some(b"old_value"))])?;
    let r2 = write_and_open(dir.path(), "new.sst", &[(b"key", Some(b"new_value"))])?;

    // r2 sits at the higher index, so it must win regardless of value content.
    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].0, b"key");
    assert_eq!(result[0].1, Some(b"new_value".to_vec()));

    Ok(())
}

#[test]
fn merge_tombstone_from_newest_source_wins_over_older_value() -> Result<()> {
    let dir = tempdir()?;
    let r1 = write_and_open(dir.path(), "old.sst", &[(b"key", Some(b"alive"))])?;
    let r2 = write_and_open(dir.path(), "new.sst", &[(b"key", None)])?;

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].1, None); // tombstone wins
    Ok(())
}

#[test]
fn merge_preserves_tombstones_no_dropping() -> Result<()> {
    let dir = tempdir()?;
    let r = write_and_open(dir.path(), "t.sst", &[(b"a", Some(b"1")), (b"b", None)])?;

    let readers = vec![r];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all()?;

    assert_eq!(result.len(), 2);
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[1].1, None);
    Ok(())
}
