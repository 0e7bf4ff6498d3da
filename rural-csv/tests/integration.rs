//! Tests d'intégration de l'import CSV

use std::io::Write;

use rural_csv::{parse, parse_file, FormatError, ImportError, PropertyType, RowErrorKind};

const HEADER: &str = "nome,tipo,area,perimetro,coordenadas,descricao";

fn csv(rows: &[&str]) -> String {
    let mut content = String::from(HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content
}

#[test]
fn test_quoted_name_keeps_comma() {
    let content = "nome,tipo,area,perimetro,coordenadas\n\
                   \"Fazenda, São José\",fazenda,10.5,400,\"[[0,0],[0,1],[1,1],[1,0]]\"";
    let batch = parse(content).unwrap();

    assert_eq!(batch.records.len(), 1);
    let record = &batch.records[0];
    assert_eq!(record.name, "Fazenda, São José");
    assert_eq!(record.property_type, PropertyType::Fazenda);
    assert_eq!(record.area, 10.5);
    assert_eq!(record.perimeter, 400.0);
    assert_eq!(
        record.coordinates,
        vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
    );
}

#[test]
fn test_missing_columns_abort_import() {
    let content = "nome,area,descricao\nFazenda,10,teste";
    let err = parse(content).unwrap_err();

    assert_eq!(
        err,
        FormatError::MissingColumns(vec![
            "tipo".to_string(),
            "perimetro".to_string(),
            "coordenadas".to_string()
        ])
    );
    assert_eq!(
        err.to_string(),
        "missing required columns: tipo, perimetro, coordenadas"
    );
}

#[test]
fn test_all_rows_invalid_is_format_error() {
    let content = csv(&[
        "X,fazenda,10,400,\"[[0,0],[0,1],[1,1],[1,0]]\",",
        "Sítio,granja,10,400,\"[[0,0],[0,1],[1,1],[1,0]]\",",
        "Chácara,chacara,abc,400,\"[[0,0],[0,1],[1,1],[1,0]]\",",
    ]);
    assert_eq!(parse(&content), Err(FormatError::NoValidRows));
}

#[test]
fn test_bad_area_isolated_from_other_rows() {
    let content = csv(&[
        "Fazenda Norte,fazenda,12,500,\"[[0,0],[0,1],[1,1],[1,0]]\",soja",
        "Fazenda Sul,fazenda,abc,500,\"[[0,0],[0,1],[1,1],[1,0]]\",milho",
        "Sítio Leste,sitio,3.25,210,\"[[0,0],[0,1],[1,1],[1,0]]\",",
        "",
    ]);
    let batch = parse(&content).unwrap();

    let names: Vec<&str> = batch.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Fazenda Norte", "Sítio Leste"]);

    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].line, 3);
    assert_eq!(batch.errors[0].kind, RowErrorKind::InvalidArea);
    assert_eq!(batch.errors[0].to_string(), "Line 3: invalid area");
}

#[test]
fn test_error_messages_per_field() {
    let content = csv(&[
        "Fazenda Boa,fazenda,12,500,\"[[0,0],[0,1],[1,1],[1,0]]\",",
        "Fazenda Ruim,fazenda,12,0,\"[[0,0],[0,1],[1,1],[1,0]]\",",
        "Fazenda Torta,fazenda,12,500,\"[[0,0],[0,1]]\",",
        "Fazenda Rasa,fazenda,12,500,[[0,0],[0,1]],",
        "Lote,Granja,12,500,\"[[0,0],[0,1],[1,1],[1,0]]\",",
    ]);
    let batch = parse(&content).unwrap();
    let messages: Vec<String> = batch.errors.iter().map(|e| e.to_string()).collect();

    assert_eq!(
        messages,
        vec![
            "Line 3: invalid perimeter",
            "Line 4: coordinates must be valid and have ≥4 points",
            "Line 5: wrong column count",
            "Line 6: invalid type \"granja\"",
        ]
    );
}

#[test]
fn test_parse_file_latin1() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(b"nome,tipo,area,perimetro,coordenadas\n").unwrap();
    file.write_all(b"\"S\xEDtio S\xE3o Jo\xE3o\",sitio,2,150,\"[[0,0],[0,1],[1,1],[1,0]]\"\n")
        .unwrap();
    file.flush().unwrap();

    let batch = parse_file(file.path()).unwrap();
    assert_eq!(batch.records[0].name, "Sítio São João");
}

#[test]
fn test_parse_file_too_large() {
    let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.as_file()
        .set_len(rural_csv::input::MAX_FILE_SIZE + 1)
        .unwrap();

    let result = parse_file(file.path());
    assert!(matches!(result, Err(ImportError::FileTooLarge { .. })));
}

#[test]
fn test_parse_file_format_error_propagates() {
    let mut file = tempfile::Builder::new().suffix(".CSV").tempfile().unwrap();
    file.write_all(b"nome,tipo\nA,b\n").unwrap();
    file.flush().unwrap();

    let result = parse_file(file.path());
    assert!(matches!(
        result,
        Err(ImportError::Format(FormatError::MissingColumns(_)))
    ));
}
