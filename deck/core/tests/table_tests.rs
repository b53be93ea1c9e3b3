//! Table layout integration tests
//!
//! Exercise the generator against real files, the way the daemon uses it.

use std::fs;
use std::io::BufReader;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use deck_core::{generate, DeckLibrary, TableError};

#[test]
fn test_header_and_single_row() {
    let mut out = Vec::new();

    let summary = generate("0:left\t50:right\nA\tB\n".as_bytes(), &mut out).unwrap();

    let markup = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = markup.lines().collect();
    assert_eq!(
        lines,
        vec![
            "<deck><slide>",
            r#"<text xp="0" yp="82" sp="3" align="left">A</text>"#,
            r#"<text xp="50" yp="82" sp="3" align="right">B</text>"#,
            r#"<line xp1="0" yp1="79.71" xp2="55" yp2="79.71" sp="0.05"/>"#,
            "</slide></deck>",
        ]
    );
    assert_eq!(summary.rows, 1);
    assert_eq!(summary.columns, 2);
}

#[test]
fn test_bad_header_leaves_only_opening_tokens() {
    let mut out = Vec::new();

    let result = generate("badtoken\nA\tB\nC\tD\n".as_bytes(), &mut out);

    assert_eq!(String::from_utf8(out).unwrap(), "<deck><slide>\n");
    assert!(matches!(result, Err(TableError::MalformedHeader { .. })));
}

#[test]
fn test_generate_into_library_file() {
    let dir = TempDir::new().unwrap();
    let library = DeckLibrary::new(dir.path());
    let (name, file) = library.create("../sales.xml").unwrap();

    let input = "10:left\t40:right\t70:right\nRegion\tQ1\tQ2\nNorth\t12\t14\nSouth\t9\t11\n";
    let summary = generate(BufReader::new(input.as_bytes()), file).unwrap();

    assert_eq!(name, "sales.xml");
    assert_eq!(summary.rows, 3);
    let markup = fs::read_to_string(dir.path().join("sales.xml")).unwrap();
    assert!(markup.starts_with("<deck><slide>\n"));
    assert!(markup.ends_with("</slide></deck>\n"));
    assert_eq!(markup.matches("<text ").count(), 9);
    assert_eq!(markup.matches("<line ").count(), 3);
    // Third data row sits three spacings below the header
    assert!(markup.contains(r#"<text xp="10" yp="66" sp="3" align="left">South</text>"#));
}

#[test]
fn test_ragged_rows_use_their_own_width() {
    let mut out = Vec::new();

    generate("0:left\t30:center\t60:right\nonly\n".as_bytes(), &mut out).unwrap();

    let markup = String::from_utf8(out).unwrap();
    assert_eq!(markup.matches("<text ").count(), 1);
    assert!(markup.contains(r#"<line xp1="0" yp1="79.71" xp2="5" yp2="79.71" sp="0.05"/>"#));
}

#[test]
fn test_cells_beyond_header_use_default_column() {
    let mut out = Vec::new();

    generate("10:left\na\tb\n".as_bytes(), &mut out).unwrap();

    let markup = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = markup.lines().collect();
    assert_eq!(
        lines,
        vec![
            "<deck><slide>",
            r#"<text xp="10" yp="82" sp="3" align="left">a</text>"#,
            r#"<text xp="0" yp="82" sp="3" align="">b</text>"#,
            r#"<line xp1="10" yp1="79.71" xp2="5" yp2="79.71" sp="0.05"/>"#,
            "</slide></deck>",
        ]
    );
}

#[test]
fn test_empty_header_line_aborts() {
    let mut out = Vec::new();

    let result = generate("\nA\tB\n".as_bytes(), &mut out);

    assert_eq!(String::from_utf8(out).unwrap(), "<deck><slide>\n");
    match result {
        Err(TableError::MalformedHeader { column, field }) => {
            assert_eq!(column, 0);
            assert_eq!(field, "");
        }
        other => panic!("expected MalformedHeader, got {other:?}"),
    }
}
