mod common;

use anyhow::Result;
use common::{infer_and_read, whole, write_file};
use ironbeam_json::{Cell, JsonDataSource, JsonOptions, ParseMode, Row};
use std::fmt::Write as _;

#[test]
fn conflicting_types_widen_to_string() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "conflict.jsonl", "{\"a\":1}\n{\"a\":\"x\"}\n")?;
    let (schema, rows) = infer_and_read(&[path.clone()], &[whole(&path)?], &JsonOptions::default())?;

    assert_eq!(schema.to_string(), "{a: string}");
    assert_eq!(
        rows,
        vec![Row(vec![Cell::String("1".into())]), Row(vec![Cell::String("x".into())])]
    );
    Ok(())
}

#[test]
fn drop_malformed_ignores_unparsable_sample() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "bad.jsonl", "{\"a\":1}\n{\"a\":\n")?;
    let opts = JsonOptions::default().with_parse_mode(ParseMode::DropMalformed);
    let (schema, rows) = infer_and_read(&[path.clone()], &[whole(&path)?], &opts)?;

    assert_eq!(schema.to_string(), "{a: bigint}");
    assert_eq!(rows, vec![Row(vec![Cell::Long(1)])]);
    Ok(())
}

#[test]
fn numeric_and_nested_widening() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(
        tmp.path(),
        "nested.jsonl",
        concat!(
            "{\"n\":1,\"s\":{\"x\":1},\"l\":[1,2]}\n",
            "{\"n\":1.5,\"s\":{\"y\":\"q\"},\"l\":[3.5],\"z\":null}\n",
            "{\"n\":null,\"s\":{\"x\":true}}\n",
        ),
    )?;
    let source = JsonDataSource::for_options(&JsonOptions::default());
    let schema = source
        .infer_schema(&[path.clone()], &JsonOptions::default())?
        .expect("schema");
    assert_eq!(
        schema.to_string(),
        "{l: array<double>, n: double, s: struct<x:string,y:string>, z: string}"
    );

    let dropped = JsonOptions {
        drop_field_if_all_null: true,
        ..JsonOptions::default()
    };
    let schema = source.infer_schema(&[path], &dropped)?.expect("schema");
    assert_eq!(schema.index_of("z"), None);
    Ok(())
}

#[test]
fn primitives_as_string_types_every_leaf_as_string() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "p.jsonl", "{\"a\":1,\"b\":true,\"c\":[2.5]}\n")?;
    let opts = JsonOptions {
        primitives_as_string: true,
        ..JsonOptions::default()
    };
    let (schema, rows) = infer_and_read(&[path.clone()], &[whole(&path)?], &opts)?;
    assert_eq!(schema.to_string(), "{a: string, b: string, c: array<string>}");
    assert_eq!(
        rows,
        vec![Row(vec![
            Cell::String("1".into()),
            Cell::String("true".into()),
            Cell::Array(vec![Cell::String("2.5".into())]),
        ])]
    );
    Ok(())
}

#[test]
fn fixed_seed_gives_stable_schema() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut content = String::new();
    for i in 0..500 {
        writeln!(content, "{{\"k{}\":{i}}}", i % 37)?;
    }
    let path = write_file(tmp.path(), "wide.jsonl", &content)?;
    let opts = JsonOptions::default().with_sampling(0.3, 42);
    let source = JsonDataSource::for_options(&opts);

    let first = source.infer_schema(&[path.clone()], &opts)?;
    for _ in 0..3 {
        assert_eq!(source.infer_schema(&[path.clone()], &opts)?, first);
    }
    let full = source.infer_schema(&[path.clone()], &JsonOptions::default())?.expect("schema");
    assert_eq!(full.len(), 37);
    Ok(())
}

#[test]
fn sample_size_bounds_records_seen() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "ordered.jsonl", "{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n")?;
    let opts = JsonOptions::default().with_sample_size(3);
    let schema = JsonDataSource::for_options(&opts)
        .infer_schema(&[path.clone()], &opts)?
        .expect("schema");
    assert_eq!(schema.to_string(), "{a: bigint, b: bigint, c: bigint}");

    let one = JsonOptions::default().with_sample_size(1).with_sampling(1.0, 7);
    let schema = JsonDataSource::for_options(&one)
        .infer_schema(&[path], &one)?
        .expect("schema");
    assert_eq!(schema.len(), 1);
    Ok(())
}

#[test]
fn no_files_means_no_schema() -> Result<()> {
    for opts in [JsonOptions::default(), JsonOptions::default().with_multi_line(true)] {
        let source = JsonDataSource::for_options(&opts);
        assert_eq!(source.infer_schema(&[], &opts)?, None);
    }
    Ok(())
}

#[test]
fn empty_files_give_empty_schema() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_file(tmp.path(), "empty.json", "")?;
    for opts in [JsonOptions::default(), JsonOptions::default().with_multi_line(true)] {
        let (schema, rows) = infer_and_read(&[path.clone()], &[whole(&path)?], &opts)?;
        assert!(schema.is_empty());
        assert!(rows.is_empty());
    }
    Ok(())
}
