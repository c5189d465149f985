use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flotila::error::{FlotilaError, Result};
use flotila::excel::combined::parse_combined_rows;
use flotila::excel::{
    ingest_directory, ingest_files, list_service_files, read_artifact, write_artifact, CalamineReader, CellValue,
    SheetReader,
};
use chrono::NaiveDate;
use flotila::models::{IntervalType, IntervalValue, LastPerformed};
use tempfile::tempdir;
use zip::write::FileOptions;

/// Lector en memoria: cada archivo produce la misma hoja salvo los que
/// contienen "BROKEN" en el nombre.
struct FakeReader;

impl SheetReader for FakeReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<CellValue>>> {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if name.contains("BROKEN") {
            return Err(FlotilaError::EmptyWorkbook(name.to_string()));
        }
        if name.contains("EMPTY") {
            return Ok(vec![vec![CellValue::from("Názov")]]);
        }
        Ok(vec![
            vec![CellValue::Empty, CellValue::from("Názov"), CellValue::from("Jednotka"), CellValue::from("Norma")],
            vec![CellValue::Empty, CellValue::from("Kontrola technická STK"), CellValue::from("R"), CellValue::from(1.0)],
            vec![CellValue::Empty, CellValue::from("Výmena motorového oleja"), CellValue::Empty, CellValue::from(30000.0)],
        ])
    }
}

fn t(s: &str) -> CellValue {
    CellValue::from(s)
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, b"").unwrap();
    p
}

fn inline(r: &str, v: &str) -> String {
    format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, r, v)
}

fn num(r: &str, v: f64) -> String {
    format!(r#"<c r="{}"><v>{}</v></c>"#, r, v)
}

/// Celda con formato de fecha (numFmtId 14) sobre un serial.
fn date_cell(r: &str, serial: u32) -> String {
    format!(r#"<c r="{}" s="1"><v>{}</v></c>"#, r, serial)
}

/// Escribe un .xlsx mínimo con una hoja; cada fila es la lista de celdas ya
/// serializadas. La columna A queda vacía si ninguna celda la usa.
fn write_xlsx(path: &Path, rows: &[Vec<String>], date1904: bool) {
    const MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    const PKG: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

    let sheet_rows: String = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| format!(r#"<row r="{}">{}</row>"#, i + 1, cells.concat()))
        .collect();
    let workbook_pr = if date1904 { r#"<workbookPr date1904="1"/>"# } else { "" };

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG}"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#),
        ),
        (
            "xl/workbook.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN}" xmlns:r="{REL}">{workbook_pr}<sheets><sheet name="Servis" sheetId="1" r:id="rId1"/></sheets></workbook>"#),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG}"><Relationship Id="rId1" Type="{REL}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL}/styles" Target="styles.xml"/></Relationships>"#),
        ),
        (
            "xl/styles.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="{MAIN}"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN}"><sheetData>{sheet_rows}</sheetData></worksheet>"#),
        ),
    ];

    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    for (name, body) in parts {
        zip.start_file(name, FileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn header_cells() -> Vec<String> {
    vec![
        inline("B1", "Názov"),
        inline("C1", "Jednotka"),
        inline("D1", "Norma"),
        inline("F1", "Signalizovať"),
        inline("G1", "Zmenené"),
        inline("H1", "Posledné"),
    ]
}

#[test]
fn one_unreadable_file_does_not_stop_the_batch() {
    let dir = tempdir().unwrap();
    for name in ["ZC352BP.xlsx", "ZC 237YC.xls", "BROKEN1.xlsx", "ZC328BL.xlsx", "ZC970BP.XLSX"] {
        touch(dir.path(), name);
    }
    let set = ingest_directory(&FakeReader, dir.path());
    assert_eq!(set.len(), 4);
    assert!(set.contains_key("ZC237YC"));
    assert!(!set.contains_key("BROKEN1"));
    let services = &set["ZC352BP"];
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].interval_type, IntervalType::Year);
    assert_eq!(services[1].interval_type, IntervalType::Distance);
}

#[test]
fn non_workbooks_and_temp_files_are_ignored() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "ZC352BP.xlsx");
    touch(dir.path(), "services.json");
    touch(dir.path(), "~$ZC352BP.xlsx");
    touch(dir.path(), ".hidden.xls");
    fs::create_dir(dir.path().join("old.xlsx")).unwrap();

    let files = list_service_files(dir.path()).unwrap();
    assert_eq!(files, vec![dir.path().join("ZC352BP.xlsx")]);
}

#[test]
fn vehicles_without_services_get_no_entry() {
    let dir = tempdir().unwrap();
    let files = vec![touch(dir.path(), "EMPTY1.xlsx"), touch(dir.path(), "ZC352BP.xlsx")];
    let set = ingest_files(&FakeReader, &files);
    assert_eq!(set.keys().collect::<Vec<_>>(), vec!["ZC352BP"]);
}

#[test]
fn missing_directory_yields_empty_set() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(list_service_files(&missing), Err(FlotilaError::MissingDirectory(_))));
    assert!(ingest_directory(&FakeReader, &missing).is_empty());
}

#[test]
fn corrupt_workbook_is_skipped_by_calamine_reader() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("ZC352BP.xlsx"), b"this is not a zip archive").unwrap();
    assert!(CalamineReader.read_rows(&dir.path().join("ZC352BP.xlsx")).is_err());
    assert!(ingest_directory(&CalamineReader, dir.path()).is_empty());
}

#[test]
fn real_workbook_keeps_column_positions_and_native_dates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ZC352BP.xlsx");
    let rows = vec![
        header_cells(),
        // 45352 = 01.03.2024
        vec![inline("B2", "Kontrola technická STK"), inline("C2", "R"), num("D2", 1.0), date_cell("H2", 45352)],
        vec![inline("B3", "Výmena motorového oleja"), num("D3", 30000.0), num("F3", 3000.0)],
        // norma 15.01.2025, cambio en G el 15.01.2024
        vec![inline("B4", "Diaľničná známka"), date_cell("D4", 45672), date_cell("G4", 45306)],
    ];
    write_xlsx(&path, &rows, false);

    let read = CalamineReader.read_rows(&path).unwrap();
    assert_eq!(read[0][0], CellValue::Empty);
    assert_eq!(read[0][1], t("Názov"));
    assert_eq!(read[3][3], CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));

    let set = ingest_directory(&CalamineReader, dir.path());
    let services = &set["ZC352BP"];
    assert_eq!(services.len(), 3);

    assert_eq!(services[0].name, "Technická kontrola (STK)");
    assert_eq!(services[0].interval_type, IntervalType::Year);
    assert_eq!(services[0].interval_value, IntervalValue::Magnitude(1.0));
    assert_eq!(
        services[0].last_performed,
        Some(LastPerformed { date: NaiveDate::from_ymd_opt(2024, 3, 1), odometer: None })
    );

    assert_eq!(services[1].name, "Výmena oleja v Motore");
    assert_eq!(services[1].interval_type, IntervalType::Distance);
    assert_eq!(services[1].reminder_threshold, Some(3000.0));
    assert_eq!(services[1].last_performed, None);

    assert_eq!(services[2].interval_type, IntervalType::AbsoluteDate);
    assert_eq!(services[2].interval_value, IntervalValue::Magnitude(366.0));
    assert_eq!(services[2].last_performed.as_ref().and_then(|l| l.date), NaiveDate::from_ymd_opt(2024, 1, 15));
}

#[test]
fn workbook_in_1904_system_reads_correct_dates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ZC328BL.xlsx");
    let rows = vec![
        header_cells(),
        // 43830 en el sistema 1904 = 01.01.2024
        vec![inline("B2", "Kontrola technická STK"), inline("C2", "R"), num("D2", 1.0), date_cell("H2", 43830)],
    ];
    write_xlsx(&path, &rows, true);

    let set = ingest_directory(&CalamineReader, dir.path());
    let stk = &set["ZC328BL"][0];
    assert_eq!(stk.last_performed.as_ref().and_then(|l| l.date), NaiveDate::from_ymd_opt(2024, 1, 1));
}

#[test]
fn artifact_is_written_and_read_back() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "ZC352BP.xlsx");
    let set = ingest_directory(&FakeReader, dir.path());

    let out = dir.path().join("out").join("services.json");
    write_artifact(&set, &out).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["ZC352BP"][0]["type"], "year");
    assert_eq!(json["ZC352BP"][1]["interval"], 30000);
    assert_eq!(read_artifact(&out).unwrap(), set);
}

#[test]
fn combined_workbook_groups_rows_by_plate() {
    let rows = vec![
        vec![t("ŠPZ"), t("Názov"), t("Jednotka"), t("Norma"), t("Signalizovať")],
        vec![t("zc 352 bp"), t("Výmena motorového oleja"), CellValue::Empty, CellValue::from(30000.0), CellValue::from(3000.0)],
        vec![t(""), t("Bez placa"), CellValue::Empty, CellValue::from(10.0)],
        vec![t("ZC328BL"), t("Kontrola technická STK"), t("R"), CellValue::from(1.0)],
        vec![t("ZC352BP"), t("Kontrola technická STK"), t("R"), CellValue::from(1.0)],
    ];
    let set = parse_combined_rows(&rows).unwrap();
    assert_eq!(set.len(), 2);
    let names: Vec<&str> = set["ZC352BP"].iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Výmena oleja v Motore", "Technická kontrola (STK)"]);
    assert_eq!(set["ZC352BP"][0].reminder_threshold, Some(3000.0));
}

#[test]
fn combined_workbook_needs_a_plate_column() {
    let rows = vec![vec![CellValue::from("Názov")], vec![CellValue::from("Servis")]];
    assert!(matches!(parse_combined_rows(&rows), Err(FlotilaError::MissingColumn(_))));
}
