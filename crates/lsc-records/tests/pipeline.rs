use std::fs;

use lsc_records::{run_files, run_pipeline, FilterMode, RecordsConfig, RecordsSummary};

const INPUT: &str = "\
naam_afgeleid;city;url;category;lastmod
Cafe Central;Maastricht;https://booking.com/x?ref=1;restaurant;2024-06-01
Hotel De Kroon;Valkenburg;https://www.hoteldekroon.nl/?utm_source=vvv;hotel;2024-06-02
De Linde;;https://delinde.nl;B&B;2024-06-03
Hoeve Gulpen;Gulpen;;fietsverhuur;2024-06-04
";

fn run(mode: FilterMode) -> (RecordsSummary, String) {
    let conf = RecordsConfig {
        filter_mode: mode,
        ..Default::default()
    };
    let (summary, out) = run_pipeline(&conf, INPUT.as_bytes(), Vec::<u8>::new()).unwrap();
    (summary, String::from_utf8(out).unwrap())
}

#[test]
fn lenient_clears_blocklisted_websites() {
    let (summary, out) = run(FilterMode::Lenient);
    assert_eq!(
        out,
        "naam,plaats,website,categorie\n\
         Cafe Central,Maastricht,,Restaurant\n\
         Hotel De Kroon,Valkenburg,https://www.hoteldekroon.nl,Logies\n\
         Hoeve Gulpen,Gulpen,,Overig\n"
    );
    assert_eq!(
        summary,
        RecordsSummary {
            read: 4,
            kept: 3,
            dropped: 1,
            cleared: 1,
        }
    );
}

#[test]
fn strict_requires_a_valid_website() {
    let (summary, out) = run(FilterMode::Strict);
    assert_eq!(
        out,
        "naam,plaats,website,categorie\n\
         Hotel De Kroon,Valkenburg,https://www.hoteldekroon.nl,Logies\n"
    );
    assert_eq!(summary.read, 4);
    assert_eq!(summary.kept, 1);
    assert_eq!(summary.dropped, 3);
}

#[test]
fn header_only_when_nothing_survives() {
    let conf = RecordsConfig::default();
    let (summary, out) =
        run_pipeline(&conf, "naam;plaats\n;Epen\n".as_bytes(), Vec::<u8>::new()).unwrap();
    assert_eq!(summary.kept, 0);
    assert_eq!(String::from_utf8(out).unwrap(), "naam,plaats,website,categorie\n");
}

#[test]
fn files_without_bom() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("listings.csv");
    let output = dir.path().join("bedrijven.csv");
    fs::write(&input, INPUT).unwrap();

    let summary = run_files(&RecordsConfig::default(), &input, &output).unwrap();
    assert_eq!(summary.kept, 1);

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"naam,plaats,website,categorie\n"));
}

#[test]
fn missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let res = run_files(
        &RecordsConfig::default(),
        dir.path().join("missing.csv"),
        dir.path().join("out.csv"),
    );
    assert!(matches!(res, Err(lsc_records::RecordsError::Open { .. })));
    assert!(!dir.path().join("out.csv").exists());
}
