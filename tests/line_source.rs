mod common;

use anyhow::Result;
use common::{infer_and_read, whole, write_file};
use ironbeam_json::partition::split_file;
use ironbeam_json::{Cell, FilePartition, JsonDataSource, JsonOptions, Row};
use std::sync::Arc;

const EVENTS: &str = concat!(
    "{\"id\":1,\"name\":\"alpha\",\"tags\":[\"x\"]}\n",
    "{\"id\":2,\"name\":\"beta\"}\r\n",
    "\n",
    "{\"id\":3,\"score\":0.5}\n",
    "{\"id\":4,\"name\":\"a much longer name that spans many bytes\"}\n",
    "{\"id\":5}",
);

fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|r| match r.get(0) {
            Some(Cell::Long(n)) => *n,
            other => panic!("unexpected id cell {other:?}"),
        })
        .collect()
}

#[test]
fn whole_file_reads_every_line_in_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "events.jsonl", EVENTS)?;
    let (schema, rows) = infer_and_read(&[path.clone()], &[whole(&path)?], &JsonOptions::default())?;

    assert_eq!(schema.to_string(), "{id: bigint, name: string, score: double, tags: array<string>}");
    assert_eq!(ids(&rows), vec![1, 2, 3, 4, 5]);
    assert_eq!(rows[1].get(1), Some(&Cell::String("beta".into())));
    assert_eq!(rows[2].get(2), Some(&Cell::Double(0.5)));
    assert_eq!(rows[4].get(1), Some(&Cell::Null));
    Ok(())
}

#[test]
fn two_way_split_at_every_offset_matches_whole_read() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "events.jsonl", EVENTS)?;
    let opts = JsonOptions::default();
    let len = EVENTS.len() as u64;

    let (_, expected) = infer_and_read(&[path.clone()], &[whole(&path)?], &opts)?;
    for k in 1..len {
        let parts = [
            FilePartition { path: path.clone(), start: 0, length: k, file_len: len },
            FilePartition { path: path.clone(), start: k, length: len - k, file_len: len },
        ];
        let (_, rows) = infer_and_read(&[path.clone()], &parts, &opts)?;
        assert_eq!(rows, expected, "split at byte {k}");
    }
    Ok(())
}

#[test]
fn planned_splits_of_any_size_match_whole_read() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "events.jsonl", EVENTS)?;
    let opts = JsonOptions::default();
    let len = EVENTS.len() as u64;

    let (_, expected) = infer_and_read(&[path.clone()], &[whole(&path)?], &opts)?;
    for max in [1, 3, 7, 16, 40, len / 3, len] {
        let parts = split_file(&path, len, max, true);
        assert_eq!(parts.first().map(|p| p.start), Some(0));
        assert_eq!(parts.last().map(FilePartition::end), Some(len));
        let (_, rows) = infer_and_read(&[path.clone()], &parts, &opts)?;
        assert_eq!(ids(&rows), ids(&expected), "max split {max}");
        assert_eq!(rows, expected, "max split {max}");
    }
    Ok(())
}

#[test]
fn partition_without_line_start_is_empty() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let line = "{\"a\":\"0123456789012345678901234567890123456789\"}\n";
    let path = write_file(tmp.path(), "one.jsonl", line)?;
    let len = line.len() as u64;
    let opts = JsonOptions::default();
    let source = JsonDataSource::for_options(&opts);
    let schema = Arc::new(source.infer_schema(&[path.clone()], &opts)?.expect("schema"));

    let middle = FilePartition { path: path.clone(), start: 10, length: 10, file_len: len };
    assert_eq!(source.read_partition(&middle, Arc::clone(&schema), &opts)?.count(), 0);

    let head = FilePartition { path: path.clone(), start: 0, length: 10, file_len: len };
    assert_eq!(source.read_partition(&head, schema, &opts)?.count(), 1);
    Ok(())
}

#[test]
fn line_source_is_splittable_unless_compressed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let source = JsonDataSource::for_options(&JsonOptions::default());
    assert_eq!(source.name(), "json-lines");
    assert!(source.is_splittable(&write_file(tmp.path(), "a.jsonl", EVENTS)?));
    assert!(source.is_splittable(&write_file(tmp.path(), "a.json", EVENTS)?));
    assert!(source.is_splittable(&write_file(tmp.path(), "empty.jsonl", "")?));
    assert!(!source.is_splittable(std::path::Path::new("a.jsonl.gz")));
    assert!(!source.is_splittable(&tmp.path().join("missing.jsonl")));
    Ok(())
}
